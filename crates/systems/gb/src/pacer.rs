//! Fixed-timestep pacing for host frames
//!
//! The DMG runs at 4,194,304 T-cycles per second. A 60 Hz host frame is
//! therefore 69,905.07 cycles; the fraction is kept by counting in units of
//! `cycles * HOST_FPS` so no remainder is ever lost.

/// Master clock in T-cycles per second
pub const CLOCK_HZ: u64 = 4_194_304;
/// Host frames per second
pub const HOST_FPS: u64 = 60;

#[derive(Debug, Clone, Default)]
pub struct FramePacer {
    /// Outstanding budget, in T-cycles multiplied by HOST_FPS
    budget: i64,
}

impl FramePacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one host frame's worth of cycles
    pub fn begin_frame(&mut self) {
        self.budget += CLOCK_HZ as i64;
    }

    /// True while the current host frame still owes emulated time
    pub fn has_budget(&self) -> bool {
        self.budget > 0
    }

    /// Charge the cycles one CPU step consumed
    pub fn consume(&mut self, cycles: u32) {
        self.budget -= cycles as i64 * HOST_FPS as i64;
    }

    /// Carried-over budget in whole T-cycles (negative when overspent)
    pub fn carry(&self) -> i64 {
        self.budget / HOST_FPS as i64
    }

    pub fn reset(&mut self) {
        self.budget = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(pacer: &mut FramePacer, step: u32) -> u64 {
        pacer.begin_frame();
        let mut cycles = 0u64;
        while pacer.has_budget() {
            pacer.consume(step);
            cycles += step as u64;
        }
        cycles
    }

    #[test]
    fn test_single_frame_cycles() {
        let mut pacer = FramePacer::new();
        // 69905.07 rounds up to whole 4-cycle steps
        assert_eq!(run_frame(&mut pacer, 4), 69908);
        assert!(pacer.carry() <= 0);
    }

    #[test]
    fn test_one_second_is_exact() {
        let mut pacer = FramePacer::new();
        let total: u64 = (0..60).map(|_| run_frame(&mut pacer, 4)).sum();
        // Overshoot is bounded by one step
        assert!(total >= CLOCK_HZ);
        assert!(total < CLOCK_HZ + 4);
    }

    #[test]
    fn test_long_run_does_not_drift() {
        let mut pacer = FramePacer::new();
        let total: u64 = (0..600).map(|_| run_frame(&mut pacer, 24)).sum();
        assert!(total >= CLOCK_HZ * 10);
        assert!(total < CLOCK_HZ * 10 + 24);
    }

    #[test]
    fn test_reset_clears_budget() {
        let mut pacer = FramePacer::new();
        pacer.begin_frame();
        assert!(pacer.has_budget());
        pacer.reset();
        assert!(!pacer.has_budget());
        assert_eq!(pacer.carry(), 0);
    }
}
