//! Noise channel (DMG channel 4).
//!
//! A 15-bit LFSR clocked every `DIVISORS[r] << s` T-cycles (NR43
//! `SSSS WRRR`). Each clock XORs bits 0 and 1 into bit 14, and into bit 6
//! too in 7-bit width mode. The channel outputs its volume while bit 0 is
//! clear.

use super::envelope::Envelope;
use super::length_counter::LengthCounter;

/// Base divisors for NR43 bits 0-2
pub const NOISE_DIVISORS: [u32; 8] = [8, 16, 32, 48, 64, 80, 96, 112];

/// Noise channel state
#[derive(Debug, Clone)]
pub struct NoiseChannel {
    lfsr: u16,
    pub clock_shift: u8,
    pub width_7bit: bool,
    pub divisor_code: u8,
    timer: i32,
    pub length: LengthCounter,
    pub envelope: Envelope,
    pub enabled: bool,
    pub dac_enabled: bool,
}

impl NoiseChannel {
    pub fn new() -> Self {
        Self {
            lfsr: 0x7FFF,
            clock_shift: 0,
            width_7bit: false,
            divisor_code: 0,
            timer: 0,
            length: LengthCounter::new(64),
            envelope: Envelope::new(),
            enabled: false,
            dac_enabled: false,
        }
    }

    /// Latch NR43
    pub fn load_polynomial(&mut self, nr43: u8) {
        self.clock_shift = nr43 >> 4;
        self.width_7bit = nr43 & 0x08 != 0;
        self.divisor_code = nr43 & 0x07;
    }

    fn period(&self) -> i32 {
        (NOISE_DIVISORS[self.divisor_code as usize] << self.clock_shift) as i32
    }

    fn clock_lfsr(&mut self) {
        let xor = (self.lfsr & 1) ^ ((self.lfsr >> 1) & 1);
        self.lfsr = (self.lfsr >> 1) | (xor << 14);
        if self.width_7bit {
            self.lfsr = (self.lfsr & !(1 << 6)) | (xor << 6);
        }
    }

    pub fn step(&mut self, cycles: u32) {
        self.timer -= cycles as i32;
        while self.timer <= 0 {
            self.timer += self.period();
            self.clock_lfsr();
        }
    }

    pub fn trigger(&mut self) {
        self.enabled = self.dac_enabled;
        self.length.trigger();
        self.timer = self.period();
        self.lfsr = 0x7FFF;
        self.envelope.trigger();
    }

    pub fn clock_length(&mut self) {
        if self.length.clock() {
            self.enabled = false;
        }
    }

    pub fn output(&self) -> u8 {
        if !self.enabled || !self.dac_enabled || self.lfsr & 1 != 0 {
            return 0;
        }
        self.envelope.volume()
    }

    pub fn set_dac(&mut self, on: bool) {
        self.dac_enabled = on;
        if !on {
            self.enabled = false;
        }
    }

    pub fn lfsr(&self) -> u16 {
        self.lfsr
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for NoiseChannel {
    fn default() -> Self {
        Self::new()
    }
}
