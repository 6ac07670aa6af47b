//! DMG audio building blocks.
//!
//! Channel generators and their shared units, plus the output side
//! (box-filter resampler and the shared sample ring). The Game Boy system
//! crate wires these to the NR10-NR52 registers and the frame sequencer.
//!
//! ## Components
//!
//! - **PulseChannel**: 8-step duty waveform, optional sweep (channel 1)
//! - **WaveChannel**: 32-nibble programmable waveform
//! - **NoiseChannel**: 15/7-bit LFSR
//! - **LengthCounter**, **Envelope**, **SweepUnit**: frame-sequencer driven units
//! - **BoxFilter**: moving-average downsampler with drift correction
//! - **SampleRing**: drop-oldest SPSC ring for the host audio callback
//!
//! All channel timers run in T-cycles.

pub mod box_filter;
pub mod envelope;
pub mod length_counter;
pub mod noise;
pub mod pulse;
pub mod sample_ring;
pub mod sweep;
pub mod wave;

pub use box_filter::BoxFilter;
pub use envelope::Envelope;
pub use length_counter::LengthCounter;
pub use noise::NoiseChannel;
pub use pulse::PulseChannel;
pub use sample_ring::SampleRing;
pub use sweep::{SweepResult, SweepUnit};
pub use wave::WaveChannel;
