//! MBC1
//!
//! Up to 2MB ROM and 32KB RAM.
//!
//! # Register Map
//!
//! - 0x0000-0x1FFF: RAM enable (low nibble 0x0A enables)
//! - 0x2000-0x3FFF: ROM bank, low 5 bits. 0 selects 1.
//! - 0x4000-0x5FFF: 2-bit extra register: ROM bank bits 5-6 or RAM bank
//! - 0x6000-0x7FFF: Mode select
//!
//! In mode 0 the extra register only feeds the 0x4000 window. In mode 1 it
//! also banks 0x0000-0x3FFF (banks 0/32/64/96) and selects the RAM bank.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Mbc1 {
    ram_enabled: bool,
    bank_low: u8,
    bank_high: u8,
    mode: u8,
}

impl Default for Mbc1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mbc1 {
    pub fn new() -> Self {
        Self {
            ram_enabled: false,
            bank_low: 1,
            bank_high: 0,
            mode: 0,
        }
    }

    fn rom_bank(&self, rom: &[u8], addr: u16) -> usize {
        let bank = if addr < 0x4000 {
            if self.mode == 1 {
                (self.bank_high as usize) << 5
            } else {
                0
            }
        } else {
            ((self.bank_high as usize) << 5) | self.bank_low as usize
        };
        bank % super::rom_bank_count(rom)
    }

    fn ram_offset(&self, ram: &[u8], addr: u16) -> usize {
        let bank = if self.mode == 1 {
            self.bank_high as usize
        } else {
            0
        };
        let bank = bank % super::ram_bank_count(ram);
        bank * 0x2000 + (addr - 0xA000) as usize
    }

    pub fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        let offset = self.rom_bank(rom, addr) * 0x4000 + (addr & 0x3FFF) as usize;
        rom.get(offset).copied().unwrap_or(0xFF)
    }

    pub fn write_rom(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = val & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                self.bank_low = val & 0x1F;
                if self.bank_low == 0 {
                    self.bank_low = 1;
                }
            }
            0x4000..=0x5FFF => self.bank_high = val & 0x03,
            0x6000..=0x7FFF => self.mode = val & 0x01,
            _ => {}
        }
    }

    pub fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        if !self.ram_enabled || ram.is_empty() {
            return 0xFF;
        }
        ram.get(self.ram_offset(ram, addr)).copied().unwrap_or(0xFF)
    }

    pub fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        if !self.ram_enabled || ram.is_empty() {
            return;
        }
        let offset = self.ram_offset(ram, addr);
        if let Some(slot) = ram.get_mut(offset) {
            *slot = val;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
