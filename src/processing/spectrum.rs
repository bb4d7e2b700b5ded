//! Windowed, zero-padded magnitude spectra of slow-time signal windows.
//!
//! One parametrized operation covers all four per-frame spectra (raw
//! slow-time, unwrapped phase, filtered breathing, filtered heart): window
//! the trailing processing window with Blackman-Harris, zero-pad to the
//! vital-signs FFT size, and normalize magnitudes by `1 / fft_size` plus a
//! small floor so downstream ratios never divide by exact zero.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::{blackman_harris, ProcessingError, SPECTRUM_FLOOR};

/// Pre-planned vital-signs spectrum computation.
///
/// Purely functional: given the same input window it always produces the
/// same spectrum, and it holds no history between calls.
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    window_len: usize,
    window: Vec<f64>,
}

impl SpectralAnalyzer {
    pub fn new(window_len: usize, fft_size: usize) -> Result<Self, ProcessingError> {
        if window_len == 0 || fft_size < window_len {
            return Err(ProcessingError::InsufficientData {
                needed: window_len.max(1),
                available: fft_size,
            });
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Ok(Self {
            fft,
            fft_size,
            window_len,
            window: blackman_harris(window_len),
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Magnitude spectrum of a complex slow-time window.
    pub fn spectrum(&self, data: &[Complex<f64>]) -> Result<Vec<f64>, ProcessingError> {
        if data.len() != self.window_len {
            return Err(ProcessingError::InsufficientData {
                needed: self.window_len,
                available: data.len(),
            });
        }
        let mut buf = vec![Complex::new(0.0, 0.0); self.fft_size];
        for (i, (&d, &w)) in data.iter().zip(self.window.iter()).enumerate() {
            buf[i] = d * w;
        }
        self.fft.process(&mut buf);

        let scale = 1.0 / self.fft_size as f64;
        Ok(buf.iter().map(|c| c.norm() * scale + SPECTRUM_FLOOR).collect())
    }

    /// Magnitude spectrum of a real-valued window (phase traces, filtered
    /// waveforms).
    pub fn spectrum_real(&self, data: &[f64]) -> Result<Vec<f64>, ProcessingError> {
        let complex: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.spectrum(&complex)
    }
}

/// Find the dominant spectral peak in `spectrum[start..end]`.
///
/// Candidates are strict local maxima within the sub-range; candidates
/// closer than `min_distance` bins to a larger candidate are discarded. The
/// surviving candidate with the largest magnitude wins. Returns the absolute
/// bin index, or `None` when the sub-range contains no local maximum — the
/// caller holds its previous estimate in that case.
pub fn find_rate_peak(
    spectrum: &[f64],
    start: usize,
    end: usize,
    min_distance: usize,
) -> Option<usize> {
    let end = end.min(spectrum.len());
    if start + 2 > end {
        return None;
    }
    let region = &spectrum[start..end];

    let mut candidates: Vec<usize> = (1..region.len() - 1)
        .filter(|&i| region[i] > region[i - 1] && region[i] > region[i + 1])
        .collect();
    if candidates.is_empty() {
        return None;
    }

    // Enforce minimum separation, keeping taller peaks first.
    candidates.sort_by(|&a, &b| {
        region[b]
            .partial_cmp(&region[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let min_distance = min_distance.max(1);
    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if kept.iter().all(|&k| c.abs_diff(k) >= min_distance) {
            kept.push(c);
        }
    }

    // Sorted descending by magnitude, so the first survivor is the winner.
    kept.first().map(|&i| i + start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let fs = 20.0;
        let n = 400;
        let nfft = 1600;
        let analyzer = SpectralAnalyzer::new(n, nfft).unwrap();
        // 0.3 Hz at fs=20 with nfft=1600 lands exactly on bin 24.
        let data: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 0.3 * i as f64 / fs).sin())
            .collect();
        let spec = analyzer.spectrum_real(&data).unwrap();
        assert_eq!(spec.len(), nfft);

        let peak = spec[1..nfft / 2]
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i + 1)
            .unwrap();
        assert_eq!(peak, 24);
    }

    #[test]
    fn test_spectrum_floor_keeps_values_positive() {
        let analyzer = SpectralAnalyzer::new(64, 256).unwrap();
        let spec = analyzer.spectrum_real(&vec![0.0; 64]).unwrap();
        for v in spec {
            assert!(v >= SPECTRUM_FLOOR);
        }
    }

    #[test]
    fn test_window_length_enforced() {
        let analyzer = SpectralAnalyzer::new(64, 256).unwrap();
        assert!(analyzer.spectrum_real(&vec![0.0; 63]).is_err());
    }

    #[test]
    fn test_find_rate_peak_picks_tallest_local_maximum() {
        let mut spec = vec![0.1; 100];
        spec[20] = 0.5;
        spec[40] = 0.9;
        spec[60] = 0.3;
        assert_eq!(find_rate_peak(&spec, 10, 90, 2), Some(40));
    }

    #[test]
    fn test_find_rate_peak_respects_sub_range() {
        let mut spec = vec![0.1; 100];
        spec[5] = 2.0; // outside the search range
        spec[50] = 0.4;
        assert_eq!(find_rate_peak(&spec, 10, 90, 2), Some(50));
    }

    #[test]
    fn test_find_rate_peak_none_on_flat_region() {
        let spec = vec![0.25; 100];
        assert_eq!(find_rate_peak(&spec, 10, 90, 2), None);
    }

    #[test]
    fn test_find_rate_peak_min_distance_discards_shoulder() {
        let mut spec = vec![0.0; 50];
        spec[20] = 1.0;
        spec[22] = 0.9; // shoulder peak within min distance of the winner
        spec[30] = 0.5;
        // The winner is still the tallest peak regardless of the shoulder.
        assert_eq!(find_rate_peak(&spec, 0, 50, 4), Some(20));
    }
}
