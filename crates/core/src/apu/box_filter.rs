//! Box-filter resampler.
//!
//! Downconverts a high-rate integer sample stream (the mixer runs once per
//! machine cycle) to the host device rate by averaging consecutive blocks
//! ("boxes") of input. The nominal width is `round(source / target)`; a
//! Bresenham-style error term in units of `1 / target` tracks how far the
//! boxes emitted so far drift from the true ratio and widens or narrows the
//! next box by one sample to pull it back.

/// Moving-average downsampler
#[derive(Debug, Clone)]
pub struct BoxFilter {
    source_rate: u64,
    target_rate: u64,
    nominal_width: u32,
    width: u32,
    sum: u64,
    count: u32,
    error: i64,
    scale: f32,
}

impl BoxFilter {
    /// `scale` multiplies each averaged output sample
    pub fn new(source_rate: u32, target_rate: u32, scale: f32) -> Self {
        let source_rate = source_rate as u64;
        let target_rate = target_rate.max(1) as u64;
        let nominal = ((source_rate + target_rate / 2) / target_rate).max(1) as u32;
        Self {
            source_rate,
            target_rate,
            nominal_width: nominal,
            width: nominal,
            sum: 0,
            count: 0,
            error: 0,
            scale,
        }
    }

    /// Nominal number of input samples per output sample
    pub fn box_width(&self) -> u32 {
        self.nominal_width
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Add one input sample; returns an output sample when a box completes
    pub fn push(&mut self, sample: u16) -> Option<f32> {
        self.sum += sample as u64;
        self.count += 1;
        if self.count < self.width {
            return None;
        }

        let out = self.sum as f32 / self.width as f32 * self.scale;
        self.error += self.source_rate as i64 - (self.width as u64 * self.target_rate) as i64;
        self.sum = 0;
        self.count = 0;

        let half = (self.target_rate / 2) as i64;
        self.width = if self.error > half {
            self.nominal_width + 1
        } else if self.error < -half && self.nominal_width > 1 {
            self.nominal_width - 1
        } else {
            self.nominal_width
        };
        Some(out)
    }

    /// Drop any partial box and the accumulated drift
    pub fn reset(&mut self) {
        self.sum = 0;
        self.count = 0;
        self.error = 0;
        self.width = self.nominal_width;
    }
}
