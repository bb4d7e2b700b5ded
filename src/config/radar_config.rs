//! Radar Configuration - All pipeline parameters as operator-tunable TOML values
//!
//! Every parameter that drives the processing pipeline is a field in this
//! module. Each struct implements `Default` with values matching the validated
//! bench setup, ensuring zero-change behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults::SPEED_OF_LIGHT;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a radar deployment.
///
/// Load with `RadarConfig::load()` which searches:
/// 1. `$RADAR_VITALS_CONFIG` env var
/// 2. `./radar_vitals.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RadarConfig {
    /// Radar device geometry and chirp parameters
    #[serde(default)]
    pub device: DeviceConfig,

    /// Processing window sizes and FFT lengths
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Target range-bin tracking
    #[serde(default)]
    pub target: TargetConfig,

    /// Presence detection thresholds
    #[serde(default)]
    pub presence: PresenceConfig,

    /// Physiological band edges
    #[serde(default)]
    pub bands: BandConfig,
}

impl RadarConfig {
    /// Load configuration using the standard search order:
    /// 1. `$RADAR_VITALS_CONFIG` environment variable
    /// 2. `./radar_vitals.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("RADAR_VITALS_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded radar config from RADAR_VITALS_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from RADAR_VITALS_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "RADAR_VITALS_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./radar_vitals.toml
        let local = PathBuf::from("radar_vitals.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded radar config from ./radar_vitals.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./radar_vitals.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No radar_vitals.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all parameters for internal consistency.
    ///
    /// Rules:
    /// - Device geometry must be non-degenerate (antennas, samples, rate > 0)
    /// - Window sizes must be consistent (buffer >= processing window)
    /// - Band edges must satisfy `0 < low < high < sample_rate / 2`
    /// - The object-distance window must be ordered and non-negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let d = &self.device;
        if d.frame_rate_hz <= 0.0 || !d.frame_rate_hz.is_finite() {
            errors.push(format!(
                "device.frame_rate_hz must be a positive finite number, got {}",
                d.frame_rate_hz
            ));
        }
        if d.num_antennas == 0 {
            errors.push("device.num_antennas must be > 0".to_string());
        }
        if d.num_chirps_per_frame == 0 {
            errors.push("device.num_chirps_per_frame must be > 0".to_string());
        }
        if d.num_samples_per_chirp < 2 {
            errors.push("device.num_samples_per_chirp must be >= 2".to_string());
        }
        if d.chirp_bandwidth_hz <= 0.0 || !d.chirp_bandwidth_hz.is_finite() {
            errors.push(format!(
                "device.chirp_bandwidth_hz must be a positive finite number, got {}",
                d.chirp_bandwidth_hz
            ));
        }

        let p = &self.processing;
        if p.processing_window_secs == 0 {
            errors.push("processing.processing_window_secs must be > 0".to_string());
        }
        if p.buffer_secs < p.processing_window_secs {
            errors.push(format!(
                "processing.buffer_secs ({}) must be >= processing_window_secs ({})",
                p.buffer_secs, p.processing_window_secs
            ));
        }
        if p.estimation_secs == 0 || p.estimation_secs > p.buffer_secs {
            errors.push(format!(
                "processing.estimation_secs ({}) must be in 1..=buffer_secs ({})",
                p.estimation_secs, p.buffer_secs
            ));
        }

        let t = &self.target;
        if t.object_distance_start_m < 0.0 || t.object_distance_stop_m <= t.object_distance_start_m
        {
            errors.push(format!(
                "target: object distance window [{}, {}] must be ordered and non-negative",
                t.object_distance_start_m, t.object_distance_stop_m
            ));
        }
        // A stop distance past the max unambiguous range is tolerated; the
        // bin conversion clamps it to the end of the half-spectrum.

        if self.presence.threshold <= 0.0 || !self.presence.threshold.is_finite() {
            errors.push(format!(
                "presence.threshold must be a positive finite number, got {}",
                self.presence.threshold
            ));
        }
        if self.presence.hysteresis_secs == 0 {
            errors.push("presence.hysteresis_secs must be > 0".to_string());
        }

        let sample_rate = self.sample_rate_hz();
        Self::check_band(&self.bands.breathing, "bands.breathing", sample_rate, &mut errors);
        Self::check_band(&self.bands.heart, "bands.heart", sample_rate, &mut errors);
        if self.filter_order() < 3 {
            errors.push("bands.filter_order must be >= 3".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_band(band: &BandEdges, name: &str, sample_rate: f64, errors: &mut Vec<String>) {
        if !band.low_hz.is_finite() || !band.high_hz.is_finite() {
            errors.push(format!(
                "{name}: band edges must be finite (got low={}, high={})",
                band.low_hz, band.high_hz
            ));
            return;
        }
        if !(band.low_hz > 0.0 && band.low_hz < band.high_hz && band.high_hz < sample_rate / 2.0) {
            errors.push(format!(
                "{name}: band [{}, {}] must satisfy 0 < low < high < {} (Nyquist)",
                band.low_hz,
                band.high_hz,
                sample_rate / 2.0
            ));
        }
        if band.low_hz >= sample_rate / 4.0 {
            errors.push(format!(
                "{name}: low edge ({}) must be below sample_rate/4 ({})",
                band.low_hz,
                sample_rate / 4.0
            ));
        }
    }

    // ========================================================================
    // Derived Values
    // ========================================================================

    /// Slow-time sampling rate (Hz). Equals the frame rate when one chirp
    /// per frame is used, which is the vital-signs configuration.
    pub fn sample_rate_hz(&self) -> f64 {
        self.device.frame_rate_hz
    }

    /// Slow-time samples kept in the long ring buffers.
    pub fn buffer_len(&self) -> usize {
        (self.processing.buffer_secs as f64 * self.sample_rate_hz()) as usize
    }

    /// Slow-time samples in one processing window.
    pub fn processing_len(&self) -> usize {
        (self.processing.processing_window_secs as f64 * self.sample_rate_hz()) as usize
    }

    /// Slow-time samples in the trailing rate-estimation window.
    pub fn estimation_len(&self) -> usize {
        (self.processing.estimation_secs as f64 * self.sample_rate_hz()) as usize
    }

    /// FIR bandpass length in taps: the configured override, or
    /// `sample_rate + 1` so the filter tracks the frame rate.
    pub fn filter_order(&self) -> usize {
        self.bands
            .filter_order
            .unwrap_or(self.sample_rate_hz() as usize + 1)
    }

    /// FFT length for the per-frame range profile (2x zero-padded).
    pub fn range_fft_size(&self) -> usize {
        self.device.num_samples_per_chirp * 2
    }

    /// FFT length for the vital-signs spectra (4x zero-padded processing window).
    pub fn vitals_fft_size(&self) -> usize {
        self.processing_len() * 4
    }

    /// Range resolution (m per bin before zero-padding).
    pub fn range_resolution_m(&self) -> f64 {
        SPEED_OF_LIGHT / (2.0 * self.device.chirp_bandwidth_hz)
    }

    /// Maximum unambiguous range (m).
    pub fn max_range_m(&self) -> f64 {
        self.range_resolution_m() * self.device.num_samples_per_chirp as f64 / 2.0
    }

    /// Convert a physical distance (m) to a range-profile bin index, clamped
    /// to the valid half-spectrum.
    pub fn distance_to_bin(&self, distance_m: f64) -> usize {
        let half = self.range_fft_size() / 2;
        let bin = (distance_m / self.max_range_m() * half as f64) as usize;
        bin.min(half)
    }

    /// Range-profile bin bounds of the configured object-distance window.
    pub fn object_bin_range(&self) -> (usize, usize) {
        (
            self.distance_to_bin(self.target.object_distance_start_m),
            self.distance_to_bin(self.target.object_distance_stop_m),
        )
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({0}): {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({0}): {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Device Config
// ============================================================================

/// Radar front-end geometry and chirp parameters.
///
/// These must match the physical device configuration. The defaults are for
/// a 60 GHz FMCW sensor running the vital-signs chirp profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Frame rate (Hz). With one chirp per frame this is also the slow-time
    /// sampling rate for the vital-signs spectra.
    #[serde(default = "default_frame_rate")]
    pub frame_rate_hz: f64,

    /// Number of receive antennas per frame.
    #[serde(default = "default_num_antennas")]
    pub num_antennas: usize,

    /// Chirps per frame. The vital-signs profile uses 1.
    #[serde(default = "default_num_chirps")]
    pub num_chirps_per_frame: usize,

    /// ADC samples per chirp (fast-time length).
    #[serde(default = "default_num_samples")]
    pub num_samples_per_chirp: usize,

    /// Chirp sweep bandwidth (Hz). Determines range resolution.
    #[serde(default = "default_chirp_bandwidth")]
    pub chirp_bandwidth_hz: f64,
}

fn default_frame_rate() -> f64 { 20.0 }
fn default_num_antennas() -> usize { 3 }
fn default_num_chirps() -> usize { 1 }
fn default_num_samples() -> usize { 64 }
fn default_chirp_bandwidth() -> f64 { 5.5e9 }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: default_frame_rate(),
            num_antennas: default_num_antennas(),
            num_chirps_per_frame: default_num_chirps(),
            num_samples_per_chirp: default_num_samples(),
            chirp_bandwidth_hz: default_chirp_bandwidth(),
        }
    }
}

// ============================================================================
// Processing Config
// ============================================================================

/// Window lengths for the slow-time processing pipeline. All in seconds;
/// frame counts are derived from the configured frame rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Length of the sliding window fed to the vital-signs FFTs (seconds).
    #[serde(default = "default_processing_window_secs")]
    pub processing_window_secs: u64,

    /// Total slow-time history retained (seconds).
    #[serde(default = "default_buffer_secs")]
    pub buffer_secs: u64,

    /// Trailing window used to smooth rate estimates (seconds).
    #[serde(default = "default_estimation_secs")]
    pub estimation_secs: u64,
}

fn default_processing_window_secs() -> u64 { 20 }
fn default_buffer_secs() -> u64 { 100 }
fn default_estimation_secs() -> u64 { 5 }

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            processing_window_secs: default_processing_window_secs(),
            buffer_secs: default_buffer_secs(),
            estimation_secs: default_estimation_secs(),
        }
    }
}

// ============================================================================
// Target Tracking Config
// ============================================================================

/// How the slow-time sample is extracted from each range spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetStrategy {
    /// Take the spectrum value at the smoothed peak bin.
    #[default]
    Peak,
    /// Take the mean spectrum magnitude over the object-distance window.
    Mean,
}

/// Target range-bin tracking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Near edge of the expected subject distance (m).
    #[serde(default = "default_distance_start")]
    pub object_distance_start_m: f64,

    /// Far edge of the expected subject distance (m).
    #[serde(default = "default_distance_stop")]
    pub object_distance_stop_m: f64,

    /// Slow-time sample extraction strategy.
    #[serde(default)]
    pub strategy: TargetStrategy,
}

fn default_distance_start() -> f64 { 0.5 }
fn default_distance_stop() -> f64 { 1.0 }

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            object_distance_start_m: default_distance_start(),
            object_distance_stop_m: default_distance_stop(),
            strategy: TargetStrategy::default(),
        }
    }
}

// ============================================================================
// Presence Config
// ============================================================================

/// Presence detection thresholds and hysteresis timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Smoothed range-profile energy above this means a subject is present.
    #[serde(default = "default_presence_threshold")]
    pub threshold: f64,

    /// An Absent reading within this window of any Present reading is
    /// overridden back to Present (seconds).
    #[serde(default = "default_hysteresis_secs")]
    pub hysteresis_secs: u64,
}

fn default_presence_threshold() -> f64 { 0.002 }
fn default_hysteresis_secs() -> u64 { 5 }

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            threshold: default_presence_threshold(),
            hysteresis_secs: default_hysteresis_secs(),
        }
    }
}

// ============================================================================
// Band Config
// ============================================================================

/// One physiological frequency band (Hz).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandEdges {
    pub low_hz: f64,
    pub high_hz: f64,
}

/// Physiological band edges and the shared FIR filter order.
///
/// Band edges are runtime-adjustable through the pipeline's `set_band` API;
/// the values here are the startup defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    /// Breathing band (Hz). 0.15-0.6 Hz covers 9-36 breaths per minute.
    #[serde(default = "default_breathing_band")]
    pub breathing: BandEdges,

    /// Heart band (Hz). 0.85-2.4 Hz covers 51-144 beats per minute.
    #[serde(default = "default_heart_band")]
    pub heart: BandEdges,

    /// FIR bandpass filter length (taps). When unset, resolves to
    /// `sample_rate + 1` so the filter length tracks the frame rate. Odd
    /// values keep the passband centered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_order: Option<usize>,
}

fn default_breathing_band() -> BandEdges {
    BandEdges { low_hz: 0.15, high_hz: 0.6 }
}
fn default_heart_band() -> BandEdges {
    BandEdges { low_hz: 0.85, high_hz: 2.4 }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            breathing: default_breathing_band(),
            heart: default_heart_band(),
            filter_order: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = RadarConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: RadarConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.device.frame_rate_hz, 20.0);
        assert_eq!(config.device.num_antennas, 3);
        assert_eq!(config.processing.processing_window_secs, 20);
        assert_eq!(config.bands.breathing.low_hz, 0.15);
        assert_eq!(config.presence.threshold, 0.002);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[device]
frame_rate_hz = 10.0

[presence]
threshold = 0.005
"#;
        let config: RadarConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        // Overridden values
        assert_eq!(config.device.frame_rate_hz, 10.0);
        assert_eq!(config.presence.threshold, 0.005);
        // Non-overridden values retain defaults
        assert_eq!(config.device.num_samples_per_chirp, 64);
        assert_eq!(config.bands.heart.high_hz, 2.4);
    }

    #[test]
    fn test_derived_sizes_match_default_setup() {
        let config = RadarConfig::default();
        assert_eq!(config.buffer_len(), 2000);
        assert_eq!(config.processing_len(), 400);
        assert_eq!(config.estimation_len(), 100);
        assert_eq!(config.range_fft_size(), 128);
        assert_eq!(config.vitals_fft_size(), 1600);
    }

    #[test]
    fn test_object_bin_range() {
        let config = RadarConfig::default();
        let max_range = config.max_range_m();
        let (start, stop) = config.object_bin_range();
        assert!(start < stop);
        assert_eq!(start, (0.5 / max_range * 64.0) as usize);
        // 1.0 m is past the max unambiguous range, so the stop bin clamps
        // to the end of the half-spectrum.
        assert_eq!(stop, 64);
    }

    #[test]
    fn test_filter_order_tracks_sample_rate() {
        // Unset filter order resolves to sample_rate + 1 at any frame rate.
        let mut config = RadarConfig::default();
        assert_eq!(config.filter_order(), 21);
        config.device.frame_rate_hz = 40.0;
        assert_eq!(config.filter_order(), 41);
        // An explicit override wins over the derived value.
        config.bands.filter_order = Some(31);
        assert_eq!(config.filter_order(), 31);
    }

    #[test]
    fn test_validation_catches_inverted_band() {
        let mut config = RadarConfig::default();
        config.bands.breathing = BandEdges { low_hz: 0.6, high_hz: 0.15 };
        assert!(config.validate().is_err(), "Inverted band edges should fail");
    }

    #[test]
    fn test_validation_catches_band_above_nyquist() {
        let mut config = RadarConfig::default();
        config.bands.heart = BandEdges { low_hz: 0.85, high_hz: 11.0 };
        assert!(config.validate().is_err(), "Band above Nyquist should fail");
    }

    #[test]
    fn test_validation_catches_inverted_distance_window() {
        let mut config = RadarConfig::default();
        config.target.object_distance_start_m = 1.5;
        config.target.object_distance_stop_m = 0.5;
        assert!(config.validate().is_err(), "Inverted distance window should fail");
    }

    #[test]
    fn test_validation_catches_buffer_shorter_than_window() {
        let mut config = RadarConfig::default();
        config.processing.buffer_secs = 10;
        assert!(config.validate().is_err(), "Buffer shorter than window should fail");
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = RadarConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: RadarConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original.device.frame_rate_hz, roundtripped.device.frame_rate_hz);
        assert_eq!(original.bands.filter_order, roundtripped.bands.filter_order);
        assert_eq!(original.target.strategy, roundtripped.target.strategy);
    }

    #[test]
    fn test_strategy_parses_snake_case() {
        let config: RadarConfig =
            toml::from_str("[target]\nstrategy = \"mean\"").expect("should parse");
        assert_eq!(config.target.strategy, TargetStrategy::Mean);
    }
}
