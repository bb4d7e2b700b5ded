//! Radar Configuration Module
//!
//! Provides deployment configuration loaded from TOML files: device geometry,
//! processing window sizes, presence thresholds, and physiological band
//! edges. Every value has a built-in default matching the validated bench
//! setup, so the pipeline runs with no config file present.
//!
//! ## Loading Order
//!
//! 1. `RADAR_VITALS_CONFIG` environment variable (path to TOML file)
//! 2. `radar_vitals.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(RadarConfig::load()?);
//!
//! // Anywhere in the codebase:
//! let threshold = config::get().presence.threshold;
//! ```

mod radar_config;
pub mod defaults;

pub use radar_config::*;

use std::sync::OnceLock;

/// Global radar configuration, initialized once at startup.
static RADAR_CONFIG: OnceLock<RadarConfig> = OnceLock::new();

/// Initialize the global radar configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: RadarConfig) {
    if RADAR_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global radar configuration.
///
/// Panics if `init()` has not been called. A missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static RadarConfig {
    RADAR_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    RADAR_CONFIG.get().is_some()
}
