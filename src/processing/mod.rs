//! Signal processing primitives - range FFT, spectra, and filters.

mod filters;
mod range_fft;
mod spectrum;

pub use filters::{fir_filter, firwin_bandpass, hp_filter, moving_average_same};
pub use range_fft::RangeFftStage;
pub use spectrum::{find_rate_peak, SpectralAnalyzer};

use thiserror::Error;

/// Magnitude floor added to every spectral estimate to avoid exact zeros.
pub const SPECTRUM_FLOOR: f64 = 1e-8;

/// Errors in signal processing.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Invalid band edges: low={low} Hz, high={high} Hz (sample rate {sample_rate} Hz)")]
    InvalidBand {
        low: f64,
        high: f64,
        sample_rate: f64,
    },

    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),
}

/// Symmetric 4-term Blackman-Harris window of length `n`.
///
/// Applied along the fast-time axis before the range FFT and along the
/// slow-time axis before every vital-signs spectrum.
pub fn blackman_harris(n: usize) -> Vec<f64> {
    use std::f64::consts::PI;

    const A0: f64 = 0.358_75;
    const A1: f64 = 0.488_29;
    const A2: f64 = 0.141_28;
    const A3: f64 = 0.011_68;

    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let x = 2.0 * PI * i as f64 / denom;
            A0 - A1 * x.cos() + A2 * (2.0 * x).cos() - A3 * (3.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blackman_harris_symmetry_and_peak() {
        let w = blackman_harris(64);
        assert_eq!(w.len(), 64);
        // Symmetric about the midpoint.
        for i in 0..32 {
            assert!((w[i] - w[63 - i]).abs() < 1e-12);
        }
        // Near-zero at the edges, ~1.0 in the middle.
        assert!(w[0] < 1e-4);
        let peak = w.iter().copied().fold(f64::MIN, f64::max);
        assert!((peak - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_blackman_harris_degenerate_lengths() {
        assert_eq!(blackman_harris(1), vec![1.0]);
        assert_eq!(blackman_harris(2).len(), 2);
    }
}
