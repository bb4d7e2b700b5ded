//! Processing Pipeline Module
//!
//! ## Per-Frame Data Flow
//!
//! ```text
//! raw frame ──► RangeFftStage ──► range spectrum
//!                  │
//!                  ├──► TargetBinTracker ──► slow-time sample
//!                  │        └──► PhaseUnwrapper ──► unwrapped phase
//!                  │                 └──► BandpassEstimator ──► filtered bands
//!                  │                          ├──► RateEstimator ──► bpm
//!                  │                          └──► AmplitudeNormalizer ──► 0-100
//!                  └──► PresenceDetector ──► occupancy + focused time
//! ```
//!
//! All stages are owned by [`PipelineController`], which consumes frames from
//! the acquisition queue, publishes a [`crate::types::VitalSignsSnapshot`]
//! after every
//! frame, and resets all slow-time state on a fixed interval to bound
//! accumulated phase drift.

mod amplitude;
mod bandpass;
mod controller;
mod phase;
mod presence;
mod rates;
pub mod source;
mod tracker;

pub use amplitude::AmplitudeNormalizer;
pub use bandpass::BandpassEstimator;
pub use controller::PipelineController;
pub use phase::PhaseUnwrapper;
pub use presence::PresenceDetector;
pub use rates::RateEstimator;
pub use tracker::TargetBinTracker;
