//! Frame presentation for the Game Boy PPU
//!
//! The PPU produces a buffer of shade indices (0-3). A `PpuRenderer` turns
//! that into the host-facing ARGB [`Frame`] through a fixed four-entry
//! greyscale table.
//!
//! ```text
//! Ppu (front buffer, shades) -> PpuRenderer -> Frame (0xAARRGGBB)
//! ```

use emu_core::renderer::Renderer;
use emu_core::types::{Frame, DMG_SHADES};

use crate::ppu::{Ppu, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Renderer that can consume a completed PPU frame
pub trait PpuRenderer: Renderer {
    /// Copy the PPU's front buffer into the framebuffer
    fn render_frame(&mut self, ppu: &Ppu);
}

/// Shade lookup into an ARGB framebuffer
pub struct SoftwarePpuRenderer {
    framebuffer: Frame,
    palette: [u32; 4],
}

impl SoftwarePpuRenderer {
    pub fn new() -> Self {
        Self::with_palette(DMG_SHADES)
    }

    /// Custom colours for shades 0 (lightest) to 3 (darkest)
    pub fn with_palette(palette: [u32; 4]) -> Self {
        Self {
            framebuffer: Frame::filled(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, palette[0]),
            palette,
        }
    }
}

impl Default for SoftwarePpuRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for SoftwarePpuRenderer {
    fn get_frame(&self) -> &Frame {
        &self.framebuffer
    }

    fn clear(&mut self, color: u32) {
        self.framebuffer.pixels.fill(color);
    }

    fn reset(&mut self) {
        self.clear(self.palette[0]);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = Frame::new(width, height);
    }

    fn name(&self) -> &str {
        "DMG Software Renderer"
    }
}

impl PpuRenderer for SoftwarePpuRenderer {
    fn render_frame(&mut self, ppu: &Ppu) {
        if self.framebuffer.pixels.len() != SCREEN_WIDTH * SCREEN_HEIGHT {
            self.resize(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
        }
        for (dst, &shade) in self
            .framebuffer
            .pixels
            .iter_mut()
            .zip(ppu.frame_buffer().iter())
        {
            *dst = self.palette[(shade & 0x03) as usize];
        }
    }
}
