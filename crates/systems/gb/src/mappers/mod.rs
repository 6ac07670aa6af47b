//! Game Boy Memory Bank Controllers (MBCs)
//!
//! Mappers hold only their bank registers. The [`Cartridge`](crate::cartridge::Cartridge)
//! owns the ROM and RAM images and lends them on every access, so a bank
//! index is always masked against the real image size right before use.

mod mbc0;
mod mbc1;
mod mbc2;
mod mbc3;

pub use mbc0::Mbc0;
pub use mbc1::Mbc1;
pub use mbc2::Mbc2;
pub use mbc3::{Mbc3, Rtc, RtcRegisters, RTC_CYCLES_PER_SECOND};

use serde::{Deserialize, Serialize};

/// Number of 16KB ROM banks, at least 1
fn rom_bank_count(rom: &[u8]) -> usize {
    rom.len().div_ceil(0x4000).max(1)
}

/// Number of 8KB RAM banks, at least 1
fn ram_bank_count(ram: &[u8]) -> usize {
    ram.len().div_ceil(0x2000).max(1)
}

/// Unified mapper enum that dispatches to specific implementations.
/// Serializes as its bank registers (and clock), tagged by variant.
#[derive(Debug, Serialize, Deserialize)]
pub enum Mapper {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
}

impl Mapper {
    /// Select a mapper from the cartridge type byte (0x147)
    pub fn from_cart_type(cart_type: u8) -> Option<Self> {
        let mapper = match cart_type {
            0x00 | 0x08 | 0x09 => Mapper::Mbc0(Mbc0::new()), // ROM (+RAM) (+BATTERY)
            0x01..=0x03 => Mapper::Mbc1(Mbc1::new()),         // MBC1 (+RAM) (+BATTERY)
            0x05 | 0x06 => Mapper::Mbc2(Mbc2::new()),         // MBC2 (+BATTERY)
            0x0F..=0x13 => Mapper::Mbc3(Mbc3::new()),         // MBC3 (+TIMER) (+RAM) (+BATTERY)
            _ => return None,
        };
        Some(mapper)
    }

    pub fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        match self {
            Mapper::Mbc0(m) => m.read_rom(rom, addr),
            Mapper::Mbc1(m) => m.read_rom(rom, addr),
            Mapper::Mbc2(m) => m.read_rom(rom, addr),
            Mapper::Mbc3(m) => m.read_rom(rom, addr),
        }
    }

    /// Write to ROM address space (mapper registers)
    pub fn write_rom(&mut self, addr: u16, val: u8) {
        match self {
            Mapper::Mbc0(m) => m.write_rom(addr, val),
            Mapper::Mbc1(m) => m.write_rom(addr, val),
            Mapper::Mbc2(m) => m.write_rom(addr, val),
            Mapper::Mbc3(m) => m.write_rom(addr, val),
        }
    }

    pub fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        match self {
            Mapper::Mbc0(m) => m.read_ram(ram, addr),
            Mapper::Mbc1(m) => m.read_ram(ram, addr),
            Mapper::Mbc2(m) => m.read_ram(ram, addr),
            Mapper::Mbc3(m) => m.read_ram(ram, addr),
        }
    }

    pub fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        match self {
            Mapper::Mbc0(m) => m.write_ram(ram, addr, val),
            Mapper::Mbc1(m) => m.write_ram(ram, addr, val),
            Mapper::Mbc2(m) => m.write_ram(ram, addr, val),
            Mapper::Mbc3(m) => m.write_ram(ram, addr, val),
        }
    }

    /// One M-cycle of cartridge-side time (MBC3 clock)
    pub fn tick(&mut self) {
        if let Mapper::Mbc3(m) = self {
            m.rtc.tick();
        }
    }

    pub fn reset(&mut self) {
        match self {
            Mapper::Mbc0(m) => m.reset(),
            Mapper::Mbc1(m) => m.reset(),
            Mapper::Mbc2(m) => m.reset(),
            Mapper::Mbc3(m) => m.reset(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mapper::Mbc0(_) => "NoMBC",
            Mapper::Mbc1(_) => "MBC1",
            Mapper::Mbc2(_) => "MBC2",
            Mapper::Mbc3(_) => "MBC3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapper_from_cart_type() {
        let name = |t| Mapper::from_cart_type(t).map(|m| m.name());
        assert_eq!(name(0x00), Some("NoMBC"));
        assert_eq!(name(0x09), Some("NoMBC"));
        assert_eq!(name(0x01), Some("MBC1"));
        assert_eq!(name(0x03), Some("MBC1"));
        assert_eq!(name(0x05), Some("MBC2"));
        assert_eq!(name(0x06), Some("MBC2"));
        assert_eq!(name(0x0F), Some("MBC3"));
        assert_eq!(name(0x13), Some("MBC3"));
    }

    #[test]
    fn test_unsupported_types_rejected() {
        for t in [0x04, 0x0B, 0x19, 0x1B, 0xFC, 0xFF] {
            assert!(Mapper::from_cart_type(t).is_none(), "type {:#04X}", t);
        }
    }

    #[test]
    fn test_mapper_delegation() {
        let mut rom = vec![0; 0x8000];
        rom[0] = 0xAA;
        rom[0x4000] = 0xBB;

        let mapper = Mapper::Mbc0(Mbc0::new());
        assert_eq!(mapper.read_rom(&rom, 0x0000), 0xAA);
        assert_eq!(mapper.read_rom(&rom, 0x4000), 0xBB);
    }

    #[test]
    fn test_bank_counts() {
        assert_eq!(rom_bank_count(&[]), 1);
        assert_eq!(rom_bank_count(&[0; 0x8000]), 2);
        assert_eq!(ram_bank_count(&[0; 0x800]), 1);
        assert_eq!(ram_bank_count(&[0; 0x8000]), 4);
    }
}
