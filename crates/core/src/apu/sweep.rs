//! Frequency sweep for pulse channel 1 (NR10: `-PPP NSSS`).
//!
//! Clocked at 128 Hz (frame-sequencer steps 2 and 6). Each clock with a
//! non-zero period computes `shadow +/- (shadow >> shift)`; a result above
//! 2047 disables the channel. Triggering performs one immediate overflow
//! check when the shift is non-zero.

/// Outcome of a sweep calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepResult {
    /// Nothing changed
    Idle,
    /// New 11-bit frequency to write back into the channel
    Frequency(u16),
    /// Target exceeded 2047; the channel must be disabled
    Overflow,
}

/// Sweep unit component.
#[derive(Debug, Clone, Default)]
pub struct SweepUnit {
    period: u8,
    negate: bool,
    shift: u8,
    timer: u8,
    shadow: u16,
    enabled: bool,
}

impl SweepUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch NR10
    pub fn load(&mut self, nr10: u8) {
        self.period = (nr10 >> 4) & 0x07;
        self.negate = nr10 & 0x08 != 0;
        self.shift = nr10 & 0x07;
    }

    fn reload_timer(&mut self) {
        self.timer = if self.period == 0 { 8 } else { self.period };
    }

    fn target(&self) -> u16 {
        let delta = self.shadow >> self.shift;
        if self.negate {
            self.shadow.wrapping_sub(delta)
        } else {
            self.shadow + delta
        }
    }

    /// Channel trigger. Returns false when the initial check overflows.
    pub fn trigger(&mut self, frequency: u16) -> bool {
        self.shadow = frequency;
        self.reload_timer();
        self.enabled = self.period != 0 || self.shift != 0;
        !(self.shift != 0 && self.target() > 2047)
    }

    /// One 128 Hz clock
    pub fn clock(&mut self) -> SweepResult {
        if self.timer > 0 {
            self.timer -= 1;
        }
        if self.timer != 0 {
            return SweepResult::Idle;
        }
        self.reload_timer();
        if !self.enabled || self.period == 0 {
            return SweepResult::Idle;
        }

        let target = self.target();
        if target > 2047 {
            return SweepResult::Overflow;
        }
        if self.shift == 0 {
            return SweepResult::Idle;
        }
        self.shadow = target;
        // Second check against the new shadow value
        if self.target() > 2047 {
            return SweepResult::Overflow;
        }
        SweepResult::Frequency(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_trigger_overflow_check() {
        let mut sweep = SweepUnit::new();
        sweep.load(0x11); // period 1, up, shift 1
        assert!(sweep.trigger(0x400));
        assert!(!sweep.trigger(0x6AB));
    }

    #[test]
    fn sweep_trigger_without_shift_never_overflows() {
        let mut sweep = SweepUnit::new();
        sweep.load(0x70);
        assert!(sweep.trigger(0x7FF));
    }

    #[test]
    fn sweep_clock_updates_frequency() {
        let mut sweep = SweepUnit::new();
        sweep.load(0x12); // period 1, up, shift 2
        assert!(sweep.trigger(0x100));
        assert_eq!(sweep.clock(), SweepResult::Frequency(0x140));
        assert_eq!(sweep.clock(), SweepResult::Frequency(0x190));
    }

    #[test]
    fn sweep_negate_decreases() {
        let mut sweep = SweepUnit::new();
        sweep.load(0x19); // period 1, down, shift 1
        sweep.trigger(0x200);
        assert_eq!(sweep.clock(), SweepResult::Frequency(0x100));
    }

    #[test]
    fn sweep_waits_for_period() {
        let mut sweep = SweepUnit::new();
        sweep.load(0x31); // period 3
        sweep.trigger(0x100);
        assert_eq!(sweep.clock(), SweepResult::Idle);
        assert_eq!(sweep.clock(), SweepResult::Idle);
        assert_eq!(sweep.clock(), SweepResult::Frequency(0x180));
    }

    #[test]
    fn sweep_clock_overflow() {
        let mut sweep = SweepUnit::new();
        sweep.load(0x11);
        sweep.trigger(0x500);
        // 0x500 + 0x280 = 0x780, then next target 0x780 + 0x3C0 > 2047
        assert_eq!(sweep.clock(), SweepResult::Overflow);
    }
}
