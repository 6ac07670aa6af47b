//! Volume envelope for the DMG pulse and noise channels.
//!
//! Configured from an NRx2 byte (`VVVV APPP`): initial volume, direction
//! (1 = up) and period. Clocked at 64 Hz by frame-sequencer step 7. A
//! period of 0 freezes the volume.

/// Envelope generator component.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    initial_volume: u8,
    increase: bool,
    period: u8,
    timer: u8,
    volume: u8,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the NRx2 register value (takes effect on the next trigger)
    pub fn load(&mut self, nrx2: u8) {
        self.initial_volume = nrx2 >> 4;
        self.increase = nrx2 & 0x08 != 0;
        self.period = nrx2 & 0x07;
    }

    /// Restart from the initial volume
    pub fn trigger(&mut self) {
        self.volume = self.initial_volume;
        self.timer = self.period;
    }

    /// One 64 Hz sequencer clock
    pub fn clock(&mut self) {
        if self.period == 0 {
            return;
        }
        if self.timer > 0 {
            self.timer -= 1;
        }
        if self.timer == 0 {
            self.timer = self.period;
            if self.increase && self.volume < 15 {
                self.volume += 1;
            } else if !self.increase && self.volume > 0 {
                self.volume -= 1;
            }
        }
    }

    /// Current volume (0-15)
    pub fn volume(&self) -> u8 {
        self.volume
    }
}
