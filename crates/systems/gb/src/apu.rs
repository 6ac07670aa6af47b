//! Game Boy APU (Audio Processing Unit) implementation.
//!
//! Wires the reusable channel components from `emu_core::apu` to the
//! NR10-NR52 registers and the frame sequencer.
//!
//! ## Register Map
//!
//! - **$FF10-$FF14**: Pulse 1 (NR10-NR14)
//! - **$FF16-$FF19**: Pulse 2 (NR21-NR24)
//! - **$FF1A-$FF1E**: Wave (NR30-NR34)
//! - **$FF20-$FF23**: Noise (NR41-NR44)
//! - **$FF24**: Master volume (NR50), stored only
//! - **$FF25**: Panning (NR51), stored only; output is mono
//! - **$FF26**: Power and channel status (NR52)
//! - **$FF30-$FF3F**: Wave RAM
//!
//! Registers read back through a fixed mask: write-only bits read as 1.
//!
//! ## Frame Sequencer
//!
//! Clocked by the falling edge of bit 4 of DIV (512 Hz):
//! - Steps 0, 2, 4, 6: length counters
//! - Steps 2, 6: sweep
//! - Step 7: envelopes
//!
//! ## Output
//!
//! Once per machine cycle the four channel outputs (0-15 each) are summed
//! and pushed through a [`BoxFilter`] running at 1,048,576 Hz. Finished
//! samples are batched and handed to the shared [`SampleRing`].

use emu_core::apu::{BoxFilter, NoiseChannel, PulseChannel, SampleRing, WaveChannel};
use emu_core::logging::{log, LogCategory, LogLevel};

/// Mixer input rate: one sample per machine cycle
pub const MIX_RATE: u32 = 1_048_576;
/// Largest possible mixer sum (4 channels x 15)
const MIX_MAX: f32 = 60.0;
/// Samples buffered before taking the ring lock
const BATCH: usize = 64;

const REG_BASE: u16 = 0xFF10;
const REG_COUNT: usize = 0x17;

/// OR-mask applied when reading NR10-NR52
const READ_MASKS: [u8; REG_COUNT] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // unused, NR21-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // unused, NR41-NR44
    0x00, 0x00, 0x70, // NR50-NR52
];

/// Register state the DMG boot ROM leaves behind
const POST_BOOT: [(u16, u8); 19] = [
    (0xFF10, 0x80),
    (0xFF11, 0xBF),
    (0xFF12, 0xF3),
    (0xFF13, 0xFF),
    (0xFF14, 0xBF),
    (0xFF16, 0x3F),
    (0xFF17, 0x00),
    (0xFF19, 0xBF),
    (0xFF1A, 0x7F),
    (0xFF1B, 0xFF),
    (0xFF1C, 0x9F),
    (0xFF1E, 0xBF),
    (0xFF20, 0xFF),
    (0xFF21, 0x00),
    (0xFF22, 0x00),
    (0xFF23, 0xBF),
    (0xFF24, 0x77),
    (0xFF25, 0xF3),
    (0xFF26, 0xF1),
];

pub struct Apu {
    regs: [u8; REG_COUNT],
    pulse1: PulseChannel,
    pulse2: PulseChannel,
    wave: WaveChannel,
    noise: NoiseChannel,
    power: bool,
    seq_step: u8,
    div_bit: bool,
    filter: BoxFilter,
    ring: SampleRing,
    pending: Vec<f32>,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(48_000, 8192, 0.5)
    }
}

impl Apu {
    /// `volume` (0.0-1.0) scales the mixed output
    pub fn new(sample_rate: u32, capacity: usize, volume: f32) -> Self {
        Self {
            regs: [0; REG_COUNT],
            pulse1: PulseChannel::new(true),
            pulse2: PulseChannel::new(false),
            wave: WaveChannel::new(),
            noise: NoiseChannel::new(),
            power: false,
            seq_step: 0,
            div_bit: false,
            filter: BoxFilter::new(MIX_RATE, sample_rate, volume.clamp(0.0, 1.0) / MIX_MAX),
            ring: SampleRing::new(capacity),
            pending: Vec::with_capacity(BATCH),
        }
    }

    /// Power-on state. Without a boot ROM the post-boot register values are
    /// applied without triggering any channel.
    pub fn init(&mut self, using_bootrom: bool) {
        self.power_off();
        self.wave.ram = [0; 16];
        self.div_bit = false;
        self.filter.reset();
        self.pending.clear();
        self.ring.clear();
        if using_bootrom {
            return;
        }
        self.write_power(0x80);
        for (addr, val) in POST_BOOT {
            match addr {
                0xFF14 | 0xFF19 | 0xFF1E | 0xFF23 => {
                    self.regs[(addr - REG_BASE) as usize] = val;
                    self.write_control(addr, val & 0x7F);
                }
                _ => self.write_register(addr, val),
            }
        }
        // The boot chime leaves pulse 1 flagged on with its envelope at 0
        self.pulse1.enabled = true;
    }

    pub fn power(&self) -> bool {
        self.power
    }

    /// Handle to the output ring for the host audio callback
    pub fn ring(&self) -> SampleRing {
        self.ring.clone()
    }

    /// Copy up to `out.len()` ready samples; never blocks
    pub fn read_samples(&self, out: &mut [f32]) -> usize {
        self.ring.read_samples(out)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.filter.set_scale(volume.clamp(0.0, 1.0) / MIX_MAX);
    }

    /// Push any batched samples to the ring
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.ring.push_slice(&self.pending);
            self.pending.clear();
        }
    }

    /// A DIV write restarts the divider; the next falling edge is measured
    /// from there
    pub fn reset_div_edge(&mut self) {
        self.div_bit = false;
    }

    /// Advance one machine cycle given the current DIV value
    pub fn tick(&mut self, div: u8) {
        let bit = div & 0x10 != 0;
        if self.power && self.div_bit && !bit {
            self.clock_sequencer();
        }
        self.div_bit = bit;

        let mix = if self.power {
            self.pulse1.step(4);
            self.pulse2.step(4);
            self.wave.step(4);
            self.noise.step(4);
            self.pulse1.output() as u16
                + self.pulse2.output() as u16
                + self.wave.output() as u16
                + self.noise.output() as u16
        } else {
            0
        };

        if let Some(sample) = self.filter.push(mix) {
            self.pending.push(sample);
            if self.pending.len() >= BATCH {
                self.flush();
            }
        }
    }

    fn clock_sequencer(&mut self) {
        if self.seq_step % 2 == 0 {
            self.pulse1.clock_length();
            self.pulse2.clock_length();
            self.wave.clock_length();
            self.noise.clock_length();
        }
        if self.seq_step == 2 || self.seq_step == 6 {
            self.pulse1.clock_sweep();
        }
        if self.seq_step == 7 {
            self.pulse1.envelope.clock();
            self.pulse2.envelope.clock();
            self.noise.envelope.clock();
        }
        self.seq_step = (self.seq_step + 1) & 7;
    }

    pub fn read_register(&self, addr: u16) -> u8 {
        match addr {
            0xFF26 => {
                let mut status = (if self.power { 0x80 } else { 0 }) | READ_MASKS[0x16];
                if self.pulse1.enabled {
                    status |= 0x01;
                }
                if self.pulse2.enabled {
                    status |= 0x02;
                }
                if self.wave.enabled {
                    status |= 0x04;
                }
                if self.noise.enabled {
                    status |= 0x08;
                }
                status
            }
            0xFF10..=0xFF25 => {
                let i = (addr - REG_BASE) as usize;
                self.regs[i] | READ_MASKS[i]
            }
            0xFF30..=0xFF3F => self.wave.ram[(addr - 0xFF30) as usize],
            _ => 0xFF,
        }
    }

    pub fn write_register(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF30..=0xFF3F => {
                self.wave.ram[(addr - 0xFF30) as usize] = val;
                return;
            }
            0xFF26 => {
                self.write_power(val);
                return;
            }
            0xFF10..=0xFF25 => {}
            _ => return,
        }
        if !self.power {
            return;
        }
        self.regs[(addr - REG_BASE) as usize] = val;

        match addr {
            0xFF10 => {
                if let Some(sweep) = self.pulse1.sweep.as_mut() {
                    sweep.load(val);
                }
            }
            0xFF11 => {
                self.pulse1.duty = val >> 6;
                self.pulse1.length.load(val);
            }
            0xFF12 => {
                self.pulse1.envelope.load(val);
                self.pulse1.set_dac(val & 0xF0 != 0);
            }
            0xFF13 => self.pulse1.frequency = (self.pulse1.frequency & 0x700) | val as u16,
            0xFF16 => {
                self.pulse2.duty = val >> 6;
                self.pulse2.length.load(val);
            }
            0xFF17 => {
                self.pulse2.envelope.load(val);
                self.pulse2.set_dac(val & 0xF0 != 0);
            }
            0xFF18 => self.pulse2.frequency = (self.pulse2.frequency & 0x700) | val as u16,
            0xFF1A => self.wave.set_dac(val & 0x80 != 0),
            0xFF1B => self.wave.length.load(val),
            0xFF1C => self.wave.volume_code = (val >> 5) & 0x03,
            0xFF1D => self.wave.frequency = (self.wave.frequency & 0x700) | val as u16,
            0xFF20 => self.noise.length.load(val),
            0xFF21 => {
                self.noise.envelope.load(val);
                self.noise.set_dac(val & 0xF0 != 0);
            }
            0xFF22 => self.noise.load_polynomial(val),
            0xFF14 | 0xFF19 | 0xFF1E | 0xFF23 => self.write_control(addr, val),
            _ => {}
        }
    }

    /// NRx4: frequency high bits, length enable, trigger
    fn write_control(&mut self, addr: u16, val: u8) {
        let high = ((val & 0x07) as u16) << 8;
        let length_enable = val & 0x40 != 0;
        let trigger = val & 0x80 != 0;
        match addr {
            0xFF14 => {
                let ch = &mut self.pulse1;
                ch.frequency = (ch.frequency & 0xFF) | high;
                ch.length.set_enabled(length_enable);
                if trigger {
                    ch.trigger();
                }
            }
            0xFF19 => {
                let ch = &mut self.pulse2;
                ch.frequency = (ch.frequency & 0xFF) | high;
                ch.length.set_enabled(length_enable);
                if trigger {
                    ch.trigger();
                }
            }
            0xFF1E => {
                let ch = &mut self.wave;
                ch.frequency = (ch.frequency & 0xFF) | high;
                ch.length.set_enabled(length_enable);
                if trigger {
                    ch.trigger();
                }
            }
            0xFF23 => {
                let ch = &mut self.noise;
                ch.length.set_enabled(length_enable);
                if trigger {
                    ch.trigger();
                }
            }
            _ => {}
        }
    }

    fn write_power(&mut self, val: u8) {
        let on = val & 0x80 != 0;
        if on == self.power {
            return;
        }
        log(LogCategory::APU, LogLevel::Debug, || {
            format!("Power {}", if on { "on" } else { "off" })
        });
        if on {
            self.power = true;
            self.seq_step = 0;
        } else {
            self.power_off();
        }
    }

    /// Clear NR10-NR51 and every channel; wave RAM survives
    fn power_off(&mut self) {
        self.power = false;
        self.regs = [0; REG_COUNT];
        self.pulse1.reset();
        self.pulse2.reset();
        self.wave.reset();
        self.noise.reset();
        self.seq_step = 0;
    }
}
