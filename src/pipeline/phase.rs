//! Slow-time phase unwrapping.
//!
//! Chest motion modulates the phase of the tracked range bin. The raw angle
//! wraps at +/-pi, so each tick the trailing processing window is re-unwrapped
//! and written back in place. Re-unwrapping the whole window (rather than
//! only the newest sample) keeps the window self-consistent after resets.

use num_complex::Complex;
use std::f64::consts::PI;

use crate::buffer::RingBuffer;

/// Remove 2-pi discontinuities from a phase sequence in place.
///
/// A step between consecutive samples larger than pi is treated as a wrap
/// and compensated by the nearest multiple of 2 pi.
pub fn unwrap_phase(phase: &mut [f64]) {
    if phase.len() < 2 {
        return;
    }
    let mut correction = 0.0;
    for i in 1..phase.len() {
        let raw = phase[i];
        let prev = phase[i - 1] - correction;
        let d = raw - prev;
        let mut dd = (d + PI).rem_euclid(2.0 * PI) - PI;
        if dd == -PI && d > 0.0 {
            dd = PI;
        }
        correction += dd - d;
        phase[i] = raw + correction;
    }
}

/// Maintains wrapped and unwrapped slow-time phase rings.
pub struct PhaseUnwrapper {
    wrapped: RingBuffer<f64>,
    unwrapped: RingBuffer<f64>,
    /// Trailing window re-unwrapped each tick.
    window_len: usize,
}

impl PhaseUnwrapper {
    pub fn new(buffer_len: usize, window_len: usize) -> Self {
        Self {
            wrapped: RingBuffer::zeroed(buffer_len),
            unwrapped: RingBuffer::zeroed(buffer_len),
            window_len: window_len.min(buffer_len),
        }
    }

    /// Consume one slow-time sample; returns the unwrapped trailing window.
    pub fn process(&mut self, sample: Complex<f64>) -> Vec<f64> {
        let angle = sample.arg();
        self.wrapped.push(angle);
        self.unwrapped.push(angle);

        let mut window = self.unwrapped.tail(self.window_len);
        unwrap_phase(&mut window);
        self.unwrapped.overwrite_tail(&window);
        window
    }

    /// Latest wrapped phase sample.
    pub fn latest_wrapped(&self) -> Option<f64> {
        self.wrapped.newest().copied()
    }

    /// Zero both phase rings in place, keeping them full.
    pub fn reset(&mut self) {
        self.wrapped.fill_default();
        self.unwrapped.fill_default();
    }
}
