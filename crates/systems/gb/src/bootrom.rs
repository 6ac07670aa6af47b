//! DMG boot ROM image, overlaid on 0x0000-0x00FF until FF50 is written.

use std::path::Path;

pub const BOOTROM_SIZE: usize = 0x100;

#[derive(thiserror::Error, Debug)]
pub enum BootRomError {
    #[error("Boot ROM must be 256 bytes, got {0}")]
    WrongSize(usize),
    #[error("Failed to open boot ROM: {0}")]
    OpenFailed(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct BootRom {
    data: Box<[u8; BOOTROM_SIZE]>,
}

impl std::fmt::Debug for BootRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootRom").finish_non_exhaustive()
    }
}

impl BootRom {
    pub fn from_bytes(data: &[u8]) -> Result<Self, BootRomError> {
        let data: [u8; BOOTROM_SIZE] = data
            .try_into()
            .map_err(|_| BootRomError::WrongSize(data.len()))?;
        Ok(Self {
            data: Box::new(data),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BootRomError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize & (BOOTROM_SIZE - 1)]
    }
}
