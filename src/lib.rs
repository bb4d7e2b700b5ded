//! radar-vitals: FMCW Radar Vital-Signs Monitor
//!
//! Streaming signal-processing pipeline extracting breathing rate, heart
//! rate, presence, and a normalized breathing-amplitude indicator from a
//! continuous stream of FMCW radar frames.
//!
//! ## Architecture
//!
//! - **RangeFftStage**: per-frame range spectrum, antenna-averaged
//! - **TargetBinTracker**: smoothed subject range-bin selection
//! - **PhaseUnwrapper**: slow-time phase extraction and unwrapping
//! - **BandpassEstimator**: band-limited breathing / heart filtering
//! - **RateEstimator**: spectral peak tracking, smoothed bpm
//! - **PresenceDetector**: EMA-thresholded occupancy with hysteresis
//! - **AmplitudeNormalizer**: normalized 0-100 breathing indicator
//! - **PipelineController**: owns every ring, drives one tick per frame,
//!   periodic full-state reset

pub mod buffer;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod types;

// Re-export radar configuration
pub use config::RadarConfig;

// Re-export commonly used types
pub use types::{Frame, OutputEvent, PresenceState, VitalBand, VitalSignsSnapshot};

// Re-export the pipeline surface
pub use pipeline::source::{FrameEvent, FrameSource, SyntheticSource};
pub use pipeline::{
    AmplitudeNormalizer, BandpassEstimator, PhaseUnwrapper, PipelineController,
    PresenceDetector, RateEstimator, TargetBinTracker,
};

// Re-export processing primitives
pub use processing::{ProcessingError, RangeFftStage, SpectralAnalyzer};
