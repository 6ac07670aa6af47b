//! Square-wave channel (DMG pulse 1 and pulse 2).
//!
//! An 8-step duty sequencer advanced every `(2048 - frequency) * 4`
//! T-cycles. Volume comes from an [`Envelope`], duration from a 64-step
//! [`LengthCounter`]. Pulse 1 additionally owns a [`SweepUnit`].

use super::envelope::Envelope;
use super::length_counter::LengthCounter;
use super::sweep::{SweepResult, SweepUnit};

/// Duty waveforms: 12.5%, 25%, 50%, 75%
pub const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 0],
];

/// Pulse channel state
#[derive(Debug, Clone)]
pub struct PulseChannel {
    pub duty: u8,
    duty_pos: u8,
    /// 11-bit frequency register value
    pub frequency: u16,
    timer: i32,
    pub length: LengthCounter,
    pub envelope: Envelope,
    /// Present only on pulse 1
    pub sweep: Option<SweepUnit>,
    /// Channel on (triggered and not silenced)
    pub enabled: bool,
    pub dac_enabled: bool,
}

impl PulseChannel {
    pub fn new(with_sweep: bool) -> Self {
        Self {
            duty: 0,
            duty_pos: 0,
            frequency: 0,
            timer: 0,
            length: LengthCounter::new(64),
            envelope: Envelope::new(),
            sweep: with_sweep.then(SweepUnit::new),
            enabled: false,
            dac_enabled: false,
        }
    }

    fn period(&self) -> i32 {
        (2048 - self.frequency as i32) * 4
    }

    /// Advance the waveform by `cycles` T-cycles
    pub fn step(&mut self, cycles: u32) {
        self.timer -= cycles as i32;
        while self.timer <= 0 {
            self.timer += self.period();
            self.duty_pos = (self.duty_pos + 1) & 7;
        }
    }

    pub fn trigger(&mut self) {
        self.enabled = self.dac_enabled;
        self.length.trigger();
        self.timer = self.period();
        self.envelope.trigger();
        if let Some(sweep) = self.sweep.as_mut() {
            if !sweep.trigger(self.frequency) {
                self.enabled = false;
            }
        }
    }

    pub fn clock_length(&mut self) {
        if self.length.clock() {
            self.enabled = false;
        }
    }

    pub fn clock_sweep(&mut self) {
        let Some(sweep) = self.sweep.as_mut() else {
            return;
        };
        match sweep.clock() {
            SweepResult::Idle => {}
            SweepResult::Frequency(f) => self.frequency = f,
            SweepResult::Overflow => self.enabled = false,
        }
    }

    /// Current digital output (0-15)
    pub fn output(&self) -> u8 {
        if !self.enabled || !self.dac_enabled {
            return 0;
        }
        DUTY_TABLE[(self.duty & 3) as usize][self.duty_pos as usize] * self.envelope.volume()
    }

    pub fn set_dac(&mut self, on: bool) {
        self.dac_enabled = on;
        if !on {
            self.enabled = false;
        }
    }

    pub fn reset(&mut self) {
        let with_sweep = self.sweep.is_some();
        *self = Self::new(with_sweep);
    }
}
