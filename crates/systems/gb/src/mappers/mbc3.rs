//! MBC3
//!
//! Up to 2MB ROM, 32KB RAM and an optional real-time clock.
//!
//! # Register Map
//!
//! - 0x0000-0x1FFF: RAM and RTC enable (low nibble 0x0A enables)
//! - 0x2000-0x3FFF: ROM bank, 7 bits. 0 selects 1.
//! - 0x4000-0x5FFF: RAM bank (0x00-0x03) or RTC register (0x08-0x0C)
//! - 0x6000-0x7FFF: Latch. A 0x00 then 0x01 write copies the live clock
//!   into the latched registers the CPU reads.
//!
//! # RTC Registers
//!
//! - 0x08: seconds, 0x09: minutes, 0x0A: hours, 0x0B: day counter low
//! - 0x0C: bit 0 day counter bit 8, bit 6 halt, bit 7 day carry

use serde::{Deserialize, Serialize};

/// M-cycles per emulated second
pub const RTC_CYCLES_PER_SECOND: u32 = 1_048_576;

/// One set of clock registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcRegisters {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    /// 9-bit day counter
    pub days: u16,
    pub halted: bool,
    pub day_carry: bool,
}

impl RtcRegisters {
    fn read(&self, select: u8) -> u8 {
        match select {
            0x08 => self.seconds,
            0x09 => self.minutes,
            0x0A => self.hours,
            0x0B => self.days as u8,
            0x0C => {
                ((self.days >> 8) as u8 & 0x01)
                    | if self.halted { 0x40 } else { 0 }
                    | if self.day_carry { 0x80 } else { 0 }
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, select: u8, val: u8) {
        match select {
            0x08 => self.seconds = val & 0x3F,
            0x09 => self.minutes = val & 0x3F,
            0x0A => self.hours = val & 0x1F,
            0x0B => self.days = (self.days & 0x100) | val as u16,
            0x0C => {
                self.days = (self.days & 0xFF) | (((val & 0x01) as u16) << 8);
                self.halted = val & 0x40 != 0;
                self.day_carry = val & 0x80 != 0;
            }
            _ => {}
        }
    }

    fn advance_second(&mut self) {
        self.seconds = (self.seconds + 1) & 0x3F;
        if self.seconds != 60 {
            return;
        }
        self.seconds = 0;
        self.minutes = (self.minutes + 1) & 0x3F;
        if self.minutes != 60 {
            return;
        }
        self.minutes = 0;
        self.hours = (self.hours + 1) & 0x1F;
        if self.hours != 24 {
            return;
        }
        self.hours = 0;
        self.days += 1;
        if self.days > 0x1FF {
            self.days = 0;
            self.day_carry = true;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rtc {
    pub live: RtcRegisters,
    pub latched: RtcRegisters,
    subsecond: u32,
}

impl Rtc {
    /// Advance by one M-cycle
    pub fn tick(&mut self) {
        if self.live.halted {
            return;
        }
        self.subsecond += 1;
        if self.subsecond >= RTC_CYCLES_PER_SECOND {
            self.subsecond = 0;
            self.live.advance_second();
        }
    }

    fn latch(&mut self) {
        self.latched = self.live;
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Mbc3 {
    ram_enabled: bool,
    rom_bank: u8,
    select: u8,
    latch_prev: u8,
    pub rtc: Rtc,
}

impl Default for Mbc3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mbc3 {
    pub fn new() -> Self {
        Self {
            ram_enabled: false,
            rom_bank: 1,
            select: 0,
            latch_prev: 0xFF,
            rtc: Rtc::default(),
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
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = val & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                self.rom_bank = val & 0x7F;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
            }
            0x4000..=0x5FFF => self.select = val & 0x0F,
            0x6000..=0x7FFF => {
                if self.latch_prev == 0x00 && val == 0x01 {
                    self.rtc.latch();
                }
                self.latch_prev = val;
            }
            _ => {}
        }
    }

    fn ram_offset(&self, ram: &[u8], addr: u16) -> usize {
        let bank = self.select as usize % super::ram_bank_count(ram);
        bank * 0x2000 + (addr - 0xA000) as usize
    }

    pub fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        if !self.ram_enabled {
            return 0xFF;
        }
        match self.select {
            0x00..=0x03 if !ram.is_empty() => {
                ram.get(self.ram_offset(ram, addr)).copied().unwrap_or(0xFF)
            }
            0x08..=0x0C => self.rtc.latched.read(self.select),
            _ => 0xFF,
        }
    }

    pub fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        if !self.ram_enabled {
            return;
        }
        match self.select {
            0x00..=0x03 if !ram.is_empty() => {
                let offset = self.ram_offset(ram, addr);
                if let Some(slot) = ram.get_mut(offset) {
                    *slot = val;
                }
            }
            0x08..=0x0C => {
                if self.select == 0x08 {
                    self.rtc.subsecond = 0;
                }
                self.rtc.live.write(self.select, val);
            }
            _ => {}
        }
    }

    /// Register state goes back to power-on; the clock keeps running
    pub fn reset(&mut self) {
        self.ram_enabled = false;
        self.rom_bank = 1;
        self.select = 0;
        self.latch_prev = 0xFF;
    }
}
