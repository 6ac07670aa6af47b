//! Presentation-side renderer abstraction.
//!
//! A system keeps its video state (VRAM, registers, completed shade buffer)
//! and hands finished frames to a `Renderer`, which owns the ARGB
//! [`Frame`] the host displays. The core only ever writes frames at frame
//! boundaries; the host only ever reads them.
//!
//! ```text
//! PPU (shade indices) -> Renderer -> Frame (0xAARRGGBB) -> host window / PNG
//! ```

use crate::types::Frame;

/// Owner of the host-visible framebuffer
pub trait Renderer: Send {
    /// Current framebuffer (read-only)
    fn get_frame(&self) -> &Frame;

    /// Fill the framebuffer with one ARGB8888 colour
    fn clear(&mut self, color: u32);

    /// Back to power-on contents
    fn reset(&mut self);

    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Recreate the framebuffer at a new size
    fn resize(&mut self, width: u32, height: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatRenderer {
        frame: Frame,
    }

    impl Renderer for FlatRenderer {
        fn get_frame(&self) -> &Frame {
            &self.frame
        }

        fn clear(&mut self, color: u32) {
            self.frame.pixels.fill(color);
        }

        fn reset(&mut self) {
            self.clear(0xFFFFFFFF);
        }

        fn name(&self) -> &str {
            "Flat"
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.frame = Frame::new(width, height);
        }
    }

    #[test]
    fn test_clear_and_reset() {
        let mut r = FlatRenderer {
            frame: Frame::new(160, 144),
        };
        r.clear(0xFF555555);
        assert!(r.get_frame().pixels.iter().all(|&p| p == 0xFF555555));
        r.reset();
        assert!(r.get_frame().pixels.iter().all(|&p| p == 0xFFFFFFFF));
    }

    #[test]
    fn test_resize() {
        let mut r = FlatRenderer {
            frame: Frame::new(160, 144),
        };
        r.resize(320, 288);
        assert_eq!(r.get_frame().pixels.len(), 320 * 288);
        assert_eq!(r.name(), "Flat");
    }
}
