//! Fixed-capacity audio sample ring shared between the emulation thread
//! (single producer) and the host audio callback (single consumer).
//!
//! Both sides take one short lock per call and never wait on each other.
//! When full, the oldest unread sample is overwritten so latency stays
//! bounded. Reads return however many samples are ready, possibly zero.

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct RingState {
    buf: Vec<f32>,
    head: usize,
    tail: usize,
    available: usize,
    paused: bool,
}

impl RingState {
    fn push(&mut self, sample: f32) {
        let cap = self.buf.len();
        self.buf[self.head] = sample;
        self.head = (self.head + 1) % cap;
        if self.available == cap {
            self.tail = (self.tail + 1) % cap;
        } else {
            self.available += 1;
        }
    }
}

/// Cloneable handle to a shared sample ring
#[derive(Debug, Clone)]
pub struct SampleRing {
    inner: Arc<Mutex<RingState>>,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingState {
                buf: vec![0.0; capacity.max(1)],
                head: 0,
                tail: 0,
                available: 0,
                paused: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingState> {
        // A panicked peer cannot leave the indices inconsistent
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock().buf.len()
    }

    pub fn available(&self) -> usize {
        self.lock().available
    }

    /// Producer side. Ignored while paused.
    pub fn push_slice(&self, samples: &[f32]) {
        let mut ring = self.lock();
        if ring.paused {
            return;
        }
        for &s in samples {
            ring.push(s);
        }
    }

    /// Consumer side. Copies up to `out.len()` samples and returns the count.
    pub fn read_samples(&self, out: &mut [f32]) -> usize {
        let mut ring = self.lock();
        if ring.paused {
            return 0;
        }
        let n = out.len().min(ring.available);
        let cap = ring.buf.len();
        for slot in out.iter_mut().take(n) {
            *slot = ring.buf[ring.tail];
            ring.tail = (ring.tail + 1) % cap;
        }
        ring.available -= n;
        n
    }

    pub fn set_paused(&self, paused: bool) {
        self.lock().paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn clear(&self) {
        let mut ring = self.lock();
        ring.head = 0;
        ring.tail = 0;
        ring.available = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_read_returns_available_only() {
        let ring = SampleRing::new(8);
        ring.push_slice(&[1.0, 2.0, 3.0]);
        let mut out = [0.0; 5];
        assert_eq!(ring.read_samples(&mut out), 3);
        assert_eq!(&out[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(ring.read_samples(&mut out), 0);
    }

    #[test]
    fn ring_overflow_drops_oldest() {
        let ring = SampleRing::new(4);
        ring.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(ring.available(), 4);
        let mut out = [0.0; 4];
        assert_eq!(ring.read_samples(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn ring_pause_blocks_both_sides() {
        let ring = SampleRing::new(4);
        ring.push_slice(&[1.0]);
        ring.set_paused(true);
        ring.push_slice(&[2.0]);
        let mut out = [0.0; 4];
        assert_eq!(ring.read_samples(&mut out), 0);
        ring.set_paused(false);
        assert_eq!(ring.read_samples(&mut out), 1);
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn ring_consumer_on_other_thread() {
        let ring = SampleRing::new(1024);
        let consumer = ring.clone();
        let handle = std::thread::spawn(move || {
            let mut total = 0;
            let mut out = [0.0; 64];
            for _ in 0..10_000 {
                total += consumer.read_samples(&mut out);
                if total == 500 {
                    break;
                }
                std::thread::yield_now();
            }
            total
        });
        for chunk in [0.5f32; 500].chunks(50) {
            ring.push_slice(chunk);
        }
        assert_eq!(handle.join().unwrap(), 500);
    }
}
