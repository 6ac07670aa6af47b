//! No mapper: a flat 32KB ROM, optionally with up to 8KB of RAM at
//! 0xA000 (cartridge types 0x08/0x09). Writes into ROM space are ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Mbc0;

impl Mbc0 {
    pub fn new() -> Self {
        Self
    }

    pub fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        rom.get(addr as usize).copied().unwrap_or(0xFF)
    }

    pub fn write_rom(&mut self, _addr: u16, _val: u8) {}

    pub fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        ram.get((addr - 0xA000) as usize).copied().unwrap_or(0xFF)
    }

    pub fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        if let Some(slot) = ram.get_mut((addr - 0xA000) as usize) {
            *slot = val;
        }
    }

    pub fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbc0_rom_read() {
        let mut rom = vec![0; 0x8000];
        rom[0x0000] = 0x12;
        rom[0x7FFF] = 0x34;

        let mbc = Mbc0::new();
        assert_eq!(mbc.read_rom(&rom, 0x0000), 0x12);
        assert_eq!(mbc.read_rom(&rom, 0x7FFF), 0x34);
    }

    #[test]
    fn test_mbc0_write_rom_ignored() {
        let mut rom = vec![0; 0x8000];
        rom[0x2000] = 0xAA;
        let mut mbc = Mbc0::new();

        mbc.write_rom(0x2000, 0x05);
        assert_eq!(mbc.read_rom(&rom, 0x2000), 0xAA);
    }

    #[test]
    fn test_mbc0_no_ram() {
        let mut mbc = Mbc0::new();
        let mut ram: Vec<u8> = vec![];
        mbc.write_ram(&mut ram, 0xA000, 0x42);
        assert_eq!(mbc.read_ram(&ram, 0xA000), 0xFF);
    }

    #[test]
    fn test_mbc0_with_ram() {
        let mut mbc = Mbc0::new();
        let mut ram = vec![0; 0x2000];
        mbc.write_ram(&mut ram, 0xBFFF, 0x42);
        assert_eq!(mbc.read_ram(&ram, 0xBFFF), 0x42);
    }
}
