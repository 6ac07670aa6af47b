//! Programmable wave channel (DMG channel 3).
//!
//! Plays 32 4-bit samples packed two per byte (high nibble first) in wave
//! RAM, advancing one sample every `(2048 - frequency) * 2` T-cycles. The
//! NR32 volume code selects a right shift from [`WAVE_SHIFTS`].

use super::length_counter::LengthCounter;

/// Right shift applied to a sample for each NR32 volume code
/// (100%, 25%, 50%, 12.5%)
pub const WAVE_SHIFTS: [u8; 4] = [0, 2, 1, 3];

/// Wave channel state
#[derive(Debug, Clone)]
pub struct WaveChannel {
    pub ram: [u8; 16],
    position: u8,
    pub frequency: u16,
    timer: i32,
    /// NR32 bits 5-6
    pub volume_code: u8,
    pub length: LengthCounter,
    pub enabled: bool,
    pub dac_enabled: bool,
}

impl WaveChannel {
    pub fn new() -> Self {
        Self {
            ram: [0; 16],
            position: 0,
            frequency: 0,
            timer: 0,
            volume_code: 0,
            length: LengthCounter::new(256),
            enabled: false,
            dac_enabled: false,
        }
    }

    fn period(&self) -> i32 {
        (2048 - self.frequency as i32) * 2
    }

    pub fn step(&mut self, cycles: u32) {
        self.timer -= cycles as i32;
        while self.timer <= 0 {
            self.timer += self.period();
            self.position = (self.position + 1) & 31;
        }
    }

    pub fn trigger(&mut self) {
        self.enabled = self.dac_enabled;
        self.length.trigger();
        self.timer = self.period();
        self.position = 0;
    }

    pub fn clock_length(&mut self) {
        if self.length.clock() {
            self.enabled = false;
        }
    }

    fn sample(&self) -> u8 {
        let byte = self.ram[(self.position >> 1) as usize];
        if self.position & 1 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    pub fn output(&self) -> u8 {
        if !self.enabled || !self.dac_enabled {
            return 0;
        }
        self.sample() >> WAVE_SHIFTS[(self.volume_code & 3) as usize]
    }

    pub fn set_dac(&mut self, on: bool) {
        self.dac_enabled = on;
        if !on {
            self.enabled = false;
        }
    }

    /// Power-off clears everything except wave RAM
    pub fn reset(&mut self) {
        let ram = self.ram;
        *self = Self::new();
        self.ram = ram;
    }
}

impl Default for WaveChannel {
    fn default() -> Self {
        Self::new()
    }
}
