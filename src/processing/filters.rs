//! Band-limited filtering for the physiological waveforms.
//!
//! Three building blocks, all operating on the trailing unwrapped-phase
//! window each frame:
//!
//! - [`firwin_bandpass`] designs a linear-phase FIR bandpass (windowed-sinc
//!   with a Hamming window, passband-center gain normalized to unity).
//! - [`fir_filter`] applies FIR coefficients causally with zero initial state.
//! - [`hp_filter`] splits a signal into trend and cycle components
//!   (Hodrick-Prescott decomposition, pentadiagonal solve); the heart branch
//!   bandpasses the cycle so slow chest drift never leaks into the heart band.

use super::ProcessingError;

/// Normalized sinc: `sin(pi x) / (pi x)`, with `sinc(0) = 1`.
fn sinc(x: f64) -> f64 {
    use std::f64::consts::PI;
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Design a linear-phase FIR bandpass filter.
///
/// Windowed-sinc design with a Hamming window. The taps are scaled so the
/// response magnitude at the passband center `(low + high) / 2` is exactly
/// one. Cutoffs are in Hz; `order` is the number of taps (the pipeline uses
/// `sample_rate + 1`).
pub fn firwin_bandpass(
    order: usize,
    low_hz: f64,
    high_hz: f64,
    sample_rate: f64,
) -> Result<Vec<f64>, ProcessingError> {
    use std::f64::consts::PI;

    if sample_rate <= 0.0 {
        return Err(ProcessingError::InvalidSamplingRate(sample_rate));
    }
    let nyquist = sample_rate / 2.0;
    if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
        return Err(ProcessingError::InvalidBand {
            low: low_hz,
            high: high_hz,
            sample_rate,
        });
    }
    if order < 3 {
        return Err(ProcessingError::InsufficientData {
            needed: 3,
            available: order,
        });
    }

    // Cutoffs normalized so the Nyquist frequency maps to 1.0.
    let f_low = low_hz / nyquist;
    let f_high = high_hz / nyquist;
    let center = (order - 1) as f64 / 2.0;

    let mut taps: Vec<f64> = (0..order)
        .map(|n| {
            let m = n as f64 - center;
            let ideal = f_high * sinc(f_high * m) - f_low * sinc(f_low * m);
            let window = 0.54 - 0.46 * (2.0 * PI * n as f64 / (order - 1) as f64).cos();
            ideal * window
        })
        .collect();

    // Normalize gain at the passband center to unity.
    let f_center = (f_low + f_high) / 2.0;
    let gain: f64 = taps
        .iter()
        .enumerate()
        .map(|(n, &t)| t * (PI * (n as f64 - center) * f_center).cos())
        .sum();
    for t in &mut taps {
        *t /= gain;
    }

    Ok(taps)
}

/// Apply FIR coefficients causally: `y[n] = sum_k b[k] * x[n-k]`.
///
/// Zero initial state; output has the same length as the input.
pub fn fir_filter(taps: &[f64], signal: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; signal.len()];
    for (n, o) in out.iter_mut().enumerate() {
        let k_max = n.min(taps.len() - 1);
        let mut acc = 0.0;
        for k in 0..=k_max {
            acc += taps[k] * signal[n - k];
        }
        *o = acc;
    }
    out
}

/// Hodrick-Prescott trend/cycle decomposition.
///
/// Solves `(I + lambda * D'D) trend = signal` where `D` is the second-
/// difference operator, then returns `(cycle, trend)` with
/// `cycle = signal - trend`. The system matrix is symmetric pentadiagonal
/// and positive definite, so an LDL' factorization without pivoting is
/// stable and O(n).
pub fn hp_filter(signal: &[f64], lambda: f64) -> (Vec<f64>, Vec<f64>) {
    let n = signal.len();
    if n < 3 {
        return (vec![0.0; n], signal.to_vec());
    }

    // Diagonals of I + lambda * D'D.
    let mut main = vec![0.0; n];
    let mut sub1 = vec![0.0; n - 1];
    let mut sub2 = vec![0.0; n - 2];
    for i in 0..n {
        // Column norms of D'D: [1, 5, 6, ..., 6, 5, 1], collapsing to
        // [1, 4, 1] at n = 3 where the two edge rows coincide.
        main[i] = 1.0
            + lambda
                * match i {
                    _ if i == 0 || i >= n - 1 => 1.0,
                    _ if i == 1 && i == n - 2 => 4.0,
                    _ if i == 1 || i == n - 2 => 5.0,
                    _ => 6.0,
                };
    }
    for i in 0..n - 1 {
        let edge = i == 0 || i == n - 2;
        sub1[i] = lambda * if edge { -2.0 } else { -4.0 };
    }
    for s in &mut sub2 {
        *s = lambda;
    }

    // LDL' factorization: L unit lower triangular with two subdiagonals.
    let mut d = vec![0.0; n];
    let mut l1 = vec![0.0; n - 1];
    let mut l2 = vec![0.0; n - 2];
    d[0] = main[0];
    l1[0] = sub1[0] / d[0];
    l2[0] = sub2[0] / d[0];
    d[1] = main[1] - l1[0] * l1[0] * d[0];
    if n > 2 {
        l1[1] = (sub1[1] - l2[0] * l1[0] * d[0]) / d[1];
        if n > 3 {
            l2[1] = sub2[1] / d[1];
        }
    }
    for i in 2..n {
        d[i] = main[i] - l2[i - 2] * l2[i - 2] * d[i - 2] - l1[i - 1] * l1[i - 1] * d[i - 1];
        if i < n - 1 {
            l1[i] = (sub1[i] - l2[i - 1] * l1[i - 1] * d[i - 1]) / d[i];
        }
        if i < n - 2 {
            l2[i] = sub2[i] / d[i];
        }
    }

    // Forward solve L z = signal.
    let mut z = vec![0.0; n];
    z[0] = signal[0];
    z[1] = signal[1] - l1[0] * z[0];
    for i in 2..n {
        z[i] = signal[i] - l1[i - 1] * z[i - 1] - l2[i - 2] * z[i - 2];
    }

    // Diagonal solve, then back solve L' trend = z / d.
    let mut trend = vec![0.0; n];
    trend[n - 1] = z[n - 1] / d[n - 1];
    trend[n - 2] = z[n - 2] / d[n - 2] - l1[n - 2] * trend[n - 1];
    for i in (0..n - 2).rev() {
        trend[i] = z[i] / d[i] - l1[i] * trend[i + 1] - l2[i] * trend[i + 2];
    }

    let cycle: Vec<f64> = signal.iter().zip(trend.iter()).map(|(s, t)| s - t).collect();
    (cycle, trend)
}

/// Centered moving average with zero padding at the edges ('same' mode).
///
/// The divisor is always `window`, so edge values are damped toward zero —
/// the behavior the amplitude detrend step depends on. `window` must be odd.
pub fn moving_average_same(signal: &[f64], window: usize) -> Vec<f64> {
    debug_assert!(window % 2 == 1, "moving average window must be odd");
    let half = (window / 2) as isize;
    let n = signal.len() as isize;
    (0..n)
        .map(|i| {
            let lo = (i - half).max(0);
            let hi = (i + half).min(n - 1);
            let sum: f64 = (lo..=hi).map(|j| signal[j as usize]).sum();
            sum / window as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Frequency response magnitude of an FIR filter at `freq_hz`.
    fn fir_response(taps: &[f64], freq_hz: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate;
        let (mut re, mut im) = (0.0, 0.0);
        for (n, &t) in taps.iter().enumerate() {
            re += t * (omega * n as f64).cos();
            im -= t * (omega * n as f64).sin();
        }
        (re * re + im * im).sqrt()
    }

    #[test]
    fn test_firwin_passband_and_stopband() {
        let fs = 20.0;
        let taps = firwin_bandpass(21, 0.15, 0.6, fs).unwrap();
        assert_eq!(taps.len(), 21);

        // Unity gain at the passband center, by construction.
        let center = (0.15 + 0.6) / 2.0;
        assert!((fir_response(&taps, center, fs) - 1.0).abs() < 1e-9);

        // In-band breathing tone passes with near-unity gain.
        assert!((fir_response(&taps, 0.3, fs) - 1.0).abs() < 0.1);

        // Out-of-band content is strongly attenuated.
        assert!(fir_response(&taps, 2.0, fs) < 0.1);
        assert!(fir_response(&taps, 5.0, fs) < 0.01);
    }

    #[test]
    fn test_firwin_rejects_bad_bands() {
        assert!(firwin_bandpass(21, 0.6, 0.15, 20.0).is_err());
        assert!(firwin_bandpass(21, 0.0, 0.6, 20.0).is_err());
        assert!(firwin_bandpass(21, 0.15, 10.0, 20.0).is_err());
        assert!(firwin_bandpass(21, 0.15, 0.6, 0.0).is_err());
    }

    #[test]
    fn test_fir_filter_impulse_response_is_taps() {
        let taps = vec![0.5, 0.25, 0.125];
        let mut impulse = vec![0.0; 8];
        impulse[0] = 1.0;
        let out = fir_filter(&taps, &impulse);
        assert!((out[0] - 0.5).abs() < 1e-12);
        assert!((out[1] - 0.25).abs() < 1e-12);
        assert!((out[2] - 0.125).abs() < 1e-12);
        assert!(out[3].abs() < 1e-12);
    }

    #[test]
    fn test_hp_filter_recovers_linear_trend() {
        // A pure linear signal has zero second differences, so the trend
        // should reproduce it and the cycle should vanish.
        let signal: Vec<f64> = (0..100).map(|i| 0.5 * i as f64 + 2.0).collect();
        let (cycle, trend) = hp_filter(&signal, 60.0);
        for (c, (t, s)) in cycle.iter().zip(trend.iter().zip(signal.iter())) {
            assert!(c.abs() < 1e-8);
            assert!((t - s).abs() < 1e-8);
        }
    }

    #[test]
    fn test_hp_filter_splits_fast_oscillation_from_drift() {
        let n = 200;
        let signal: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / 20.0;
                0.05 * t + (2.0 * PI * 1.5 * t).sin()
            })
            .collect();
        let (cycle, trend) = hp_filter(&signal, 60.0);
        // The oscillation energy lands in the cycle, the drift in the trend.
        let cycle_rms = (cycle.iter().map(|c| c * c).sum::<f64>() / n as f64).sqrt();
        assert!(cycle_rms > 0.3, "cycle rms {cycle_rms}");
        // Trend should be slowly varying: bounded step-to-step change.
        for w in trend.windows(2) {
            assert!((w[1] - w[0]).abs() < 0.5);
        }
    }

    #[test]
    fn test_hp_filter_short_signal() {
        let (cycle, trend) = hp_filter(&[1.0, 2.0], 60.0);
        assert_eq!(cycle, vec![0.0, 0.0]);
        assert_eq!(trend, vec![1.0, 2.0]);
    }

    #[test]
    fn test_hp_filter_three_sample_linear_signal() {
        // At n = 3 the second-difference operator is a single row, so a
        // linear signal still satisfies (I + lambda D'D) trend = signal
        // exactly; any wrong middle coefficient breaks this identity.
        let (cycle, trend) = hp_filter(&[1.0, 2.0, 3.0], 60.0);
        for (c, (t, s)) in cycle.iter().zip(trend.iter().zip([1.0, 2.0, 3.0].iter())) {
            assert!(c.abs() < 1e-9, "cycle {c}");
            assert!((t - s).abs() < 1e-9);
        }
    }

    #[test]
    fn test_moving_average_same_interior_and_edges() {
        let signal = vec![1.0; 10];
        let out = moving_average_same(&signal, 5);
        assert_eq!(out.len(), 10);
        // Interior: full window of ones.
        assert!((out[4] - 1.0).abs() < 1e-12);
        // Edge: zero padding damps toward zero (3 samples / 5).
        assert!((out[0] - 0.6).abs() < 1e-12);
    }
}
