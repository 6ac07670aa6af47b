//! Cartridge image, header parsing and mapper selection.
//!
//! # Header Fields
//!
//! ```text
//! $0134-$0143  Title (ASCII, NUL padded)
//! $0147        Cartridge type (selects the mapper)
//! $0148        ROM size: 32KB << n
//! $0149        RAM size: 0, -, 8KB, 32KB, 128KB, 64KB
//! $014D        Header checksum over $0134-$014C
//! ```

use std::path::Path;

use emu_core::logging::{log, LogCategory, LogLevel};
use serde::Deserialize;

use crate::mappers::{Mapper, Mbc2, Rtc};

#[derive(thiserror::Error, Debug)]
pub enum CartridgeError {
    #[error("ROM image too small ({0} bytes)")]
    TooSmall(usize),
    #[error("Unrecognized mapper type {0:#04X}")]
    UnrecognizedMapper(u8),
    #[error("Failed to read ROM: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded cartridge header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: String,
    pub cart_type: u8,
    /// ROM size in bytes as declared
    pub rom_size: usize,
    /// External RAM size in bytes as declared
    pub ram_size: usize,
    pub has_battery: bool,
    pub checksum: u8,
    pub checksum_ok: bool,
}

const HEADER_END: usize = 0x150;

impl CartridgeHeader {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TooSmall(data.len()));
        }

        let title: String = data[0x134..=0x143]
            .iter()
            .take_while(|&&b| b != 0)
            .filter(|b| b.is_ascii_graphic() || **b == b' ')
            .map(|&b| b as char)
            .collect();

        let cart_type = data[0x147];
        let rom_size = 0x8000usize << data[0x148].min(8);
        let ram_size = match data[0x149] {
            0x02 => 8 * 1024,
            0x03 => 32 * 1024,
            0x04 => 128 * 1024,
            0x05 => 64 * 1024,
            _ => 0,
        };

        let computed = data[0x134..=0x14C]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1));
        let checksum = data[0x14D];

        Ok(Self {
            title: title.trim_end().to_string(),
            cart_type,
            rom_size,
            ram_size,
            has_battery: matches!(cart_type, 0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13),
            checksum,
            checksum_ok: computed == checksum,
        })
    }
}

/// A loaded cartridge: ROM and RAM images plus the bank controller
#[derive(Debug)]
pub struct Cartridge {
    rom: Vec<u8>,
    ram: Vec<u8>,
    mapper: Mapper,
    header: CartridgeHeader,
}

impl Cartridge {
    /// Parse a ROM image and construct its mapper
    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let header = CartridgeHeader::parse(data)?;
        let mapper = Mapper::from_cart_type(header.cart_type)
            .ok_or(CartridgeError::UnrecognizedMapper(header.cart_type))?;

        if !header.checksum_ok {
            log(LogCategory::Cartridge, LogLevel::Warn, || {
                format!("Header checksum mismatch (stored {:#04X})", header.checksum)
            });
        }

        let mut rom = data.to_vec();
        if rom.len() < header.rom_size {
            log(LogCategory::Cartridge, LogLevel::Warn, || {
                format!(
                    "ROM is {} bytes, header declares {}; padding",
                    data.len(),
                    header.rom_size
                )
            });
            rom.resize(header.rom_size, 0xFF);
        }

        let ram_size = match mapper {
            Mapper::Mbc2(_) => Mbc2::RAM_SIZE,
            _ => header.ram_size,
        };

        log(LogCategory::Cartridge, LogLevel::Info, || {
            format!(
                "\"{}\" type {:#04X} ({}), ROM {}KB, RAM {}B{}",
                header.title,
                header.cart_type,
                mapper.name(),
                rom.len() / 1024,
                ram_size,
                if header.has_battery { ", battery" } else { "" }
            )
        });

        Ok(Self {
            rom,
            ram: vec![0; ram_size],
            mapper,
            header,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn mapper_name(&self) -> &'static str {
        self.mapper.name()
    }

    /// 0x0000-0x7FFF
    pub fn read_rom(&self, addr: u16) -> u8 {
        self.mapper.read_rom(&self.rom, addr)
    }

    pub fn write_rom(&mut self, addr: u16, val: u8) {
        self.mapper.write_rom(addr, val);
    }

    /// 0xA000-0xBFFF
    pub fn read_ram(&self, addr: u16) -> u8 {
        self.mapper.read_ram(&self.ram, addr)
    }

    pub fn write_ram(&mut self, addr: u16, val: u8) {
        self.mapper.write_ram(&mut self.ram, addr, val);
    }

    /// MBC3 clock, if this cartridge has one
    pub fn rtc(&self) -> Option<&Rtc> {
        match &self.mapper {
            Mapper::Mbc3(m) => Some(&m.rtc),
            _ => None,
        }
    }

    pub fn rtc_mut(&mut self) -> Option<&mut Rtc> {
        match &mut self.mapper {
            Mapper::Mbc3(m) => Some(&mut m.rtc),
            _ => None,
        }
    }

    pub fn tick(&mut self) {
        self.mapper.tick();
    }

    /// Mapper registers back to power-on. RAM contents survive.
    pub fn reset(&mut self) {
        self.mapper.reset();
    }

    /// Battery-backed RAM contents, if the cartridge has a battery
    pub fn save_ram(&self) -> Option<&[u8]> {
        (self.header.has_battery && !self.ram.is_empty()).then_some(self.ram.as_slice())
    }

    /// Restore external RAM; extra bytes are ignored, missing bytes keep
    /// their current value
    pub fn load_ram(&mut self, data: &[u8]) {
        let n = data.len().min(self.ram.len());
        self.ram[..n].copy_from_slice(&data[..n]);
    }

    /// Mapper registers and external RAM for a save state
    pub fn save_state(&self) -> serde_json::Value {
        serde_json::json!({
            "mapper": &self.mapper,
            "ram": &self.ram,
        })
    }

    /// Restore [`save_state`](Self::save_state) output. The state must come
    /// from a cartridge with the same mapper.
    pub fn load_state(&mut self, v: &serde_json::Value) -> Result<(), serde_json::Error> {
        if let Some(state) = v.get("mapper") {
            let mapper = Mapper::deserialize(state)?;
            if mapper.name() != self.mapper.name() {
                return Err(serde::de::Error::custom(format!(
                    "state is for {}, cartridge is {}",
                    mapper.name(),
                    self.mapper.name()
                )));
            }
            self.mapper = mapper;
        }
        if let Some(ram) = v.get("ram") {
            let ram = Vec::<u8>::deserialize(ram)?;
            self.load_ram(&ram);
        }
        Ok(())
    }
}
