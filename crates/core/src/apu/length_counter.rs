//! Length counter shared by all four DMG channels.
//!
//! Pulse and noise channels count 64 steps, the wave channel 256. The
//! counter is loaded as `max - value` from the length register, clocked at
//! 256 Hz on even frame-sequencer steps, and silences the channel when it
//! reaches zero with length enabled (NRx4 bit 6).

/// Length counter component.
#[derive(Debug, Clone)]
pub struct LengthCounter {
    max: u16,
    counter: u16,
    enabled: bool,
}

impl LengthCounter {
    /// `max` is 64 for pulse/noise and 256 for wave
    pub fn new(max: u16) -> Self {
        Self {
            max,
            counter: 0,
            enabled: false,
        }
    }

    /// Load from the raw length bits of NRx1
    pub fn load(&mut self, value: u8) {
        let value = (value as u16) & (self.max - 1);
        self.counter = self.max - value;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// A trigger with an expired counter reloads the full length
    pub fn trigger(&mut self) {
        if self.counter == 0 {
            self.counter = self.max;
        }
    }

    /// One 256 Hz clock. Returns true when the counter just expired.
    pub fn clock(&mut self) -> bool {
        if self.enabled && self.counter > 0 {
            self.counter -= 1;
            return self.counter == 0;
        }
        false
    }

    pub fn value(&self) -> u16 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.enabled = false;
    }
}
