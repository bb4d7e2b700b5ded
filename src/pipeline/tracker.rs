//! Target range-bin tracking.
//!
//! Picks the range bin holding the subject and reduces each range spectrum
//! to a single complex slow-time sample. The instantaneous magnitude-argmax
//! jitters between adjacent bins as the subject shifts, so the tracked bin
//! is the mean of a trailing window of per-frame argmax indices.

use num_complex::Complex;

use crate::buffer::RingBuffer;
use crate::config::TargetStrategy;

/// Tracks the subject's range bin across frames and extracts one complex
/// slow-time sample per range spectrum.
pub struct TargetBinTracker {
    /// Per-frame instantaneous argmax bin indices, oldest first.
    peak_indices: RingBuffer<usize>,
    /// Frames averaged to form the smoothed bin (2 s at the frame rate).
    smoothing_len: usize,
    /// Object-distance window as half-spectrum bin bounds.
    bin_start: usize,
    bin_stop: usize,
    strategy: TargetStrategy,
    /// Last smoothed bin, retained for snapshot publication.
    tracked_bin: usize,
}

impl TargetBinTracker {
    /// `bin_range` is the half-open `[start, stop)` bin window to search,
    /// `history_len` the argmax ring capacity, `smoothing_len` the trailing
    /// count averaged into the tracked bin.
    pub fn new(
        bin_range: (usize, usize),
        history_len: usize,
        smoothing_len: usize,
        strategy: TargetStrategy,
    ) -> Self {
        Self {
            peak_indices: RingBuffer::zeroed(history_len),
            smoothing_len: smoothing_len.max(1),
            bin_start: bin_range.0,
            bin_stop: bin_range.1,
            strategy,
            tracked_bin: 0,
        }
    }

    /// Smoothed bin index currently tracked as the subject.
    pub fn tracked_bin(&self) -> usize {
        self.tracked_bin
    }

    /// Consume one range spectrum and produce the slow-time sample.
    ///
    /// Returns the complex sample and its magnitude (the I/Q envelope).
    pub fn process(&mut self, spectrum: &[Complex<f64>]) -> (Complex<f64>, f64) {
        let stop = self.bin_stop.min(spectrum.len());
        let start = self.bin_start.min(stop);
        let window = &spectrum[start..stop];

        // Instantaneous argmax within the object-distance window.
        let argmax = window
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.norm()
                    .partial_cmp(&b.norm())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i + start)
            .unwrap_or(start);
        self.peak_indices.push(argmax);

        // Smoothed bin = mean of the trailing window, truncated toward zero.
        let tail = self.peak_indices.tail(self.smoothing_len);
        let mean = tail.iter().sum::<usize>() as f64 / tail.len() as f64;
        self.tracked_bin = (mean as usize).min(spectrum.len().saturating_sub(1));

        let sample = match self.strategy {
            TargetStrategy::Peak => spectrum[self.tracked_bin],
            TargetStrategy::Mean => {
                if window.is_empty() {
                    Complex::new(0.0, 0.0)
                } else {
                    window.iter().sum::<Complex<f64>>() / window.len() as f64
                }
            }
        };
        (sample, sample.norm())
    }

    /// Zero the argmax history in place, keeping it full.
    pub fn reset(&mut self) {
        self.peak_indices.fill_default();
        self.tracked_bin = 0;
    }
}
