//! MBC2
//!
//! Up to 256KB ROM with 512 x 4-bit built-in RAM.
//!
//! Writes to 0x0000-0x3FFF are routed by address bit 8: clear selects the
//! RAM enable register, set selects the 4-bit ROM bank register (0 maps to
//! 1). The RAM window repeats every 512 bytes across 0xA000-0xBFFF; only
//! the low nibble is stored, the high nibble reads back as 1s.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Mbc2 {
    ram_enabled: bool,
    rom_bank: u8,
}

impl Default for Mbc2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mbc2 {
    pub const RAM_SIZE: usize = 512;

    pub fn new() -> Self {
        Self {
            ram_enabled: false,
            rom_bank: 1,
        }
    }

    pub fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        let bank = if addr < 0x4000 {
            0
        } else {
            self.rom_bank as usize % super::rom_bank_count(rom)
        };
        rom.get(bank * 0x4000 + (addr & 0x3FFF) as usize)
            .copied()
            .unwrap_or(0xFF)
    }

    pub fn write_rom(&mut self, addr: u16, val: u8) {
        if addr >= 0x4000 {
            return;
        }
        if addr & 0x0100 == 0 {
            self.ram_enabled = val & 0x0F == 0x0A;
        } else {
            self.rom_bank = val & 0x0F;
            if self.rom_bank == 0 {
                self.rom_bank = 1;
            }
        }
    }

    pub fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }
        match ram.get((addr & 0x01FF) as usize) {
            Some(&nibble) => 0xF0 | (nibble & 0x0F),
            None => 0xFF,
        }
    }

    pub fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        if !self.ram_enabled {
            return;
        }
        if let Some(slot) = ram.get_mut((addr & 0x01FF) as usize) {
            *slot = val & 0x0F;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbc2_bank_select_uses_address_bit_8() {
        let mut rom = vec![0; 16 * 0x4000];
        for bank in 0..16 {
            rom[bank * 0x4000] = bank as u8;
        }
        let mut mbc = Mbc2::new();

        // Bit 8 clear: RAM enable, bank unchanged
        mbc.write_rom(0x2000, 0x05);
        assert_eq!(mbc.read_rom(&rom, 0x4000), 1);

        mbc.write_rom(0x2100, 0x05);
        assert_eq!(mbc.read_rom(&rom, 0x4000), 5);

        mbc.write_rom(0x0100, 0x00);
        assert_eq!(mbc.read_rom(&rom, 0x4000), 1);
    }

    #[test]
    fn test_mbc2_bank_masked_to_rom_size() {
        let mut rom = vec![0; 4 * 0x4000];
        rom[2 * 0x4000] = 0x22;
        let mut mbc = Mbc2::new();
        mbc.write_rom(0x0100, 0x0E); // 14 % 4 = 2
        assert_eq!(mbc.read_rom(&rom, 0x4000), 0x22);
    }

    #[test]
    fn test_mbc2_nibble_ram() {
        let mut mbc = Mbc2::new();
        let mut ram = vec![0; Mbc2::RAM_SIZE];

        mbc.write_rom(0x0000, 0x0A);
        mbc.write_ram(&mut ram, 0xA000, 0xAB);
        assert_eq!(ram[0], 0x0B);
        assert_eq!(mbc.read_ram(&ram, 0xA000), 0xFB);
        // Echoed every 512 bytes
        assert_eq!(mbc.read_ram(&ram, 0xA200), 0xFB);
        assert_eq!(mbc.read_ram(&ram, 0xBE00), 0xFB);

        mbc.write_rom(0x0000, 0x00);
        assert_eq!(mbc.read_ram(&ram, 0xA000), 0xFF);
    }
}
