//! Game Boy Timer implementation
//!
//! # Timer Registers
//!
//! - `$FF04 (DIV)`: Upper byte of the 16-bit internal divider. Any write
//!   clears the whole divider.
//! - `$FF05 (TIMA)`: Timer counter
//! - `$FF06 (TMA)`: Timer modulo, loaded into TIMA on overflow
//! - `$FF07 (TAC)`: Timer control
//!   - Bit 2: Timer enable
//!   - Bits 1-0: Clock select (divider bit 9, 3, 5, 7)
//!
//! # Timing
//!
//! The divider advances 4 per machine cycle. TIMA increments on the falling
//! edge of `divider[bit] AND enable`, so writes to DIV or TAC that drop the
//! signal from 1 to 0 also clock TIMA. On overflow TIMA reads 0x00 for one
//! machine cycle; TMA is loaded and the interrupt raised at the end of the
//! following cycle. Writing TIMA during that cycle cancels the reload.

use emu_core::logging::{log, LogCategory, LogLevel};

/// Divider value the DMG boot ROM leaves behind
pub const POST_BOOT_DIVIDER: u16 = 0xABCC;

pub struct Timer {
    /// Internal divider; DIV is the upper byte
    pub(crate) divider: u16,
    pub(crate) tima: u8,
    pub(crate) tma: u8,
    pub(crate) tac: u8,
    /// TIMA overflowed last cycle; reload pending
    pub(crate) overflow: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            divider: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            overflow: false,
        }
    }

    /// Power-on register state
    pub fn init(&mut self, using_bootrom: bool) {
        *self = Self::new();
        if !using_bootrom {
            self.divider = POST_BOOT_DIVIDER;
        }
    }

    /// DIV register value
    pub fn div(&self) -> u8 {
        (self.divider >> 8) as u8
    }

    fn signal(&self) -> bool {
        let bit = match self.tac & 0x03 {
            0 => 9,
            1 => 3,
            2 => 5,
            _ => 7,
        };
        self.tac & 0x04 != 0 && (self.divider >> bit) & 1 != 0
    }

    fn increment_tima(&mut self) {
        let (next, overflow) = self.tima.overflowing_add(1);
        self.tima = next;
        self.overflow = overflow;
    }

    /// Advance one machine cycle. Returns true when the timer interrupt
    /// should be requested.
    pub fn tick(&mut self) -> bool {
        let mut irq = false;
        if self.overflow {
            self.overflow = false;
            self.tima = self.tma;
            irq = true;
        }

        let before = self.signal();
        self.divider = self.divider.wrapping_add(4);
        if before && !self.signal() {
            self.increment_tima();
        }
        irq
    }

    pub fn read_register(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => self.div(),
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write_register(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => {
                let before = self.signal();
                self.divider = 0;
                if before {
                    self.increment_tima();
                }
                log(LogCategory::Timer, LogLevel::Trace, || {
                    "DIV reset".to_string()
                });
            }
            0xFF05 => {
                self.tima = val;
                self.overflow = false;
            }
            0xFF06 => self.tma = val,
            0xFF07 => {
                let before = self.signal();
                self.tac = val & 0x07;
                if before && !self.signal() {
                    self.increment_tima();
                }
            }
            _ => {}
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(timer: &mut Timer, n: usize) -> usize {
        (0..n).filter(|_| timer.tick()).count()
    }

    #[test]
    fn test_timer_creation() {
        let timer = Timer::new();
        assert_eq!(timer.div(), 0);
        assert_eq!(timer.read_register(0xFF07), 0xF8);
    }

    #[test]
    fn test_div_increment() {
        let mut timer = Timer::new();
        ticks(&mut timer, 63);
        assert_eq!(timer.div(), 0);
        ticks(&mut timer, 1);
        assert_eq!(timer.div(), 1);
        ticks(&mut timer, 64);
        assert_eq!(timer.div(), 2);
    }

    #[test]
    fn test_div_write_resets() {
        let mut timer = Timer::new();
        ticks(&mut timer, 200);
        timer.write_register(0xFF04, 0x55);
        assert_eq!(timer.div(), 0);
        assert_eq!(timer.divider, 0);
    }

    #[test]
    fn test_post_boot_divider() {
        let mut timer = Timer::new();
        timer.init(false);
        assert_eq!(timer.div(), 0xAB);
        timer.init(true);
        assert_eq!(timer.div(), 0);
    }

    #[test]
    fn test_tima_rate_fastest() {
        let mut timer = Timer::new();
        timer.write_register(0xFF07, 0x05); // 262144 Hz: every 4 M-cycles
        ticks(&mut timer, 4);
        assert_eq!(timer.tima, 1);
        ticks(&mut timer, 40);
        assert_eq!(timer.tima, 11);
    }

    #[test]
    fn test_tima_rate_slowest() {
        let mut timer = Timer::new();
        timer.write_register(0xFF07, 0x04); // 4096 Hz: every 256 M-cycles
        ticks(&mut timer, 255);
        assert_eq!(timer.tima, 0);
        ticks(&mut timer, 1);
        assert_eq!(timer.tima, 1);
    }

    #[test]
    fn test_overflow_reload_is_delayed() {
        let mut timer = Timer::new();
        timer.write_register(0xFF06, 0xF0);
        timer.write_register(0xFF05, 0xFF);
        timer.write_register(0xFF07, 0x05);

        assert_eq!(ticks(&mut timer, 4), 0);
        // Overflowed: reads zero for one cycle
        assert_eq!(timer.tima, 0x00);
        assert!(timer.tick());
        assert_eq!(timer.tima, 0xF0);
    }

    #[test]
    fn test_tima_write_cancels_reload() {
        let mut timer = Timer::new();
        timer.write_register(0xFF06, 0xF0);
        timer.write_register(0xFF05, 0xFF);
        timer.write_register(0xFF07, 0x05);
        ticks(&mut timer, 4);

        timer.write_register(0xFF05, 0x42);
        assert!(!timer.tick());
        assert_eq!(timer.tima, 0x42);
    }

    #[test]
    fn test_div_write_clocks_tima_on_falling_edge() {
        let mut timer = Timer::new();
        timer.write_register(0xFF07, 0x05);
        ticks(&mut timer, 2); // divider = 8, bit 3 high
        let before = timer.tima;
        timer.write_register(0xFF04, 0);
        assert_eq!(timer.tima, before + 1);
    }

    #[test]
    fn test_disabled_timer_does_not_count() {
        let mut timer = Timer::new();
        timer.write_register(0xFF07, 0x01);
        ticks(&mut timer, 1000);
        assert_eq!(timer.tima, 0);
    }
}
