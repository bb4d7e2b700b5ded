//! Breathing amplitude normalization.
//!
//! Turns the raw filtered breathing waveform into a 0-100 indicator. A
//! moving-average detrend removes residual baseline wander, then the newest
//! sample is min-max scaled against the recent detrended range. Degenerate
//! inputs (flat signal, non-finite scaling) collapse to 0 rather than
//! propagating as errors.

use crate::buffer::RingBuffer;
use crate::config::defaults::{
    AMPLITUDE_BUFFER_SIZE, AMPLITUDE_DETREND_WINDOW, AMPLITUDE_RANGE_FLOOR,
};
use crate::processing::moving_average_same;

/// Detrends and min-max scales the instantaneous breathing sample.
pub struct AmplitudeNormalizer {
    samples: RingBuffer<f64>,
}

impl Default for AmplitudeNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AmplitudeNormalizer {
    pub fn new() -> Self {
        Self {
            samples: RingBuffer::new(AMPLITUDE_BUFFER_SIZE),
        }
    }

    /// Consume one breathing sample. Returns the scaled amplitude, or
    /// `None` until the ring has filled once (cold start).
    pub fn process(&mut self, sample: f64) -> Option<f64> {
        self.samples.push(sample);
        if !self.samples.is_full() {
            return None;
        }

        let buf: Vec<f64> = self.samples.iter().copied().collect();
        let trend = moving_average_same(&buf, AMPLITUDE_DETREND_WINDOW);
        let detrended: Vec<f64> = buf.iter().zip(&trend).map(|(s, t)| s - t).collect();

        let newest = *detrended.last()?;
        let min = detrended.iter().copied().fold(f64::INFINITY, f64::min);
        let max = detrended.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max - min < AMPLITUDE_RANGE_FLOOR {
            return Some(0.0);
        }

        let scaled = (newest - min) / (max - min) * 100.0;
        if !scaled.is_finite() {
            return Some(0.0);
        }
        Some(scaled.clamp(0.0, 100.0))
    }

    /// Back to cold start: the next output waits for a full ring again.
    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_cold_start_emits_nothing() {
        let mut norm = AmplitudeNormalizer::new();
        for i in 0..AMPLITUDE_BUFFER_SIZE - 1 {
            assert_eq!(norm.process(i as f64), None);
        }
        assert!(norm.process(0.0).is_some());
    }

    #[test]
    fn test_sine_scales_into_range() {
        let mut norm = AmplitudeNormalizer::new();
        let mut out = None;
        for i in 0..300 {
            out = norm.process((2.0 * PI * 0.3 * i as f64 / 20.0).sin());
        }
        let value = out.expect("full ring should produce output");
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn test_flat_signal_emits_zero() {
        let mut norm = AmplitudeNormalizer::new();
        let mut out = None;
        for _ in 0..AMPLITUDE_BUFFER_SIZE {
            out = norm.process(5.0);
        }
        assert_eq!(out, Some(0.0));
    }

    #[test]
    fn test_peak_of_cycle_scales_high_trough_low() {
        // Feed a slow sine; when the newest sample sits at the crest of the
        // detrended cycle the scaled value should be near 100, near 0 at the
        // trough.
        let mut norm = AmplitudeNormalizer::new();
        let sample = |i: i64| (2.0 * PI * i as f64 / 100.0).sin();
        let mut at_crest = 0.0;
        for i in 0..125 {
            if let Some(v) = norm.process(sample(i)) {
                // i == 124 lands close to sin(pi/2) within the cycle.
                at_crest = v;
            }
        }
        assert!(at_crest > 60.0, "crest scaled to {at_crest}");
    }

    #[test]
    fn test_reset_returns_to_cold_start() {
        let mut norm = AmplitudeNormalizer::new();
        for _ in 0..AMPLITUDE_BUFFER_SIZE {
            norm.process(1.0);
        }
        norm.reset();
        assert_eq!(norm.process(1.0), None);
    }
}
