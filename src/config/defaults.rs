//! System-wide default constants.
//!
//! Centralises the pipeline's magic numbers, grouped by subsystem for easy
//! discovery. Anything an operator should tune lives in `RadarConfig`
//! instead.

// ============================================================================
// Physics
// ============================================================================

/// Speed of light (m/s), used for range resolution from chirp bandwidth.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

// ============================================================================
// Pipeline
// ============================================================================

/// Interval between full pipeline state resets (seconds).
///
/// Clears accumulated phase drift before it corrupts the spectral estimates.
pub const RESET_INTERVAL_SECS: u64 = 180;

/// Consumer sleep between frame-queue polls when the queue is empty (ms).
pub const IDLE_POLL_SLEEP_MS: u64 = 1;

// ============================================================================
// Rate Estimation
// ============================================================================

/// Calibration offset subtracted from every reported rate (BPM).
///
/// Empirical correction from bench comparison against a contact reference.
pub const RATE_CALIBRATION_OFFSET_BPM: f64 = 2.0;

/// Minimum separation between candidate spectral peaks (seconds).
///
/// Scaled by the vitals FFT resolution when searching band spectra.
pub const PEAK_MIN_DISTANCE_SECS: f64 = 0.01;

/// Rolling window over which rate variability is computed (seconds).
///
/// 240 s = 4 minutes of per-frame rate estimates.
pub const VARIABILITY_WINDOW_SECS: u64 = 240;

// ============================================================================
// Presence Detection
// ============================================================================

/// Span of the exponential moving average applied to breathing-band energy
/// (frames). Smoothing factor is `2 / (span + 1)`.
pub const PRESENCE_EMA_SPAN: usize = 20;

/// Capacity of the rolling presence-maximum buffer (frames).
///
/// 60 frames at 20 Hz = 3 s of smoothed energy maxima.
pub const PRESENCE_MAX_BUFFER_SIZE: usize = 60;

// ============================================================================
// Amplitude Normalization
// ============================================================================

/// Capacity of the breathing-amplitude ring buffer (frames).
pub const AMPLITUDE_BUFFER_SIZE: usize = 100;

/// Moving-average window used to detrend the amplitude buffer (frames).
pub const AMPLITUDE_DETREND_WINDOW: usize = 25;

/// Minimum detrended peak-to-peak range before normalization is meaningful.
///
/// Below this the signal is flat and the normalized amplitude reports 0.
pub const AMPLITUDE_RANGE_FLOOR: f64 = 1e-5;
