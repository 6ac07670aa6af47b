//! Core emulator primitives and traits.
//!
//! Host-agnostic pieces shared by the Game Boy machine and its frontends:
//! the SM83 CPU engine, the DMG audio building blocks, the categorised
//! logger, the renderer trait, and the `System` contract a frontend drives.

pub mod apu;
pub mod cpu_sm83;
pub mod logging;
pub mod renderer;
pub mod sm83_vectors;
pub mod types {
    use serde::{Deserialize, Serialize};

    /// Host-facing framebuffer, row-major 0xAARRGGBB
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self::filled(width, height, 0)
        }

        /// Frame with every pixel set to `argb`
        pub fn filled(width: u32, height: u32, argb: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![argb; (width * height) as usize],
            }
        }

        pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
            if x >= self.width || y >= self.height {
                return None;
            }
            self.pixels.get((y * self.width + x) as usize).copied()
        }
    }

    /// DMG greyscale shades (ARGB), lightest first
    pub const DMG_SHADES: [u32; 4] = [0xFFFFFFFF, 0xFFAAAAAA, 0xFF555555, 0xFF000000];
}

use serde_json::Value;

/// A media slot the machine exposes ("Cartridge", "BootROM")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointInfo {
    pub id: String,
    /// Display name
    pub name: String,
    /// Accepted file extensions, without the dot
    pub extensions: Vec<String>,
    /// The machine cannot run with this slot empty
    pub required: bool,
}

/// What a frontend drives: media slots, whole frames and JSON snapshots.
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Power-cycle; mounted media stays in place
    fn reset(&mut self);

    /// Run until the LCD presents a frame (or a frame's worth of cycles
    /// with the LCD off) and return it
    fn step_frame(&mut self) -> Result<types::Frame, Self::Error>;

    /// Snapshot of machine state. Media contents are not included.
    fn save_state(&self) -> Value;

    /// Restore a snapshot taken with the same media mounted
    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error>;

    fn supports_save_states(&self) -> bool {
        false
    }

    fn mount_points(&self) -> Vec<MountPointInfo>;

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error>;

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error>;

    fn is_mounted(&self, mount_point_id: &str) -> bool;
}
