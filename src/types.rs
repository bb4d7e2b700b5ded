//! Shared data structures for the radar vital-signs pipeline
//!
//! This module defines the core types flowing through the pipeline:
//! - Frame: one raw radar frame from the acquisition source
//! - PresenceState: occupancy state with hysteresis-backed transitions
//! - OutputEvent: notifications published to the observer task
//! - VitalSignsSnapshot: the full published state, swapped atomically
//!   after every processed frame

use chrono::{DateTime, Utc};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

// ============================================================================
// Raw Frames
// ============================================================================

/// One raw radar frame: real-valued ADC data shaped antenna x chirp x sample.
#[derive(Debug, Clone)]
pub struct Frame {
    pub samples: Array3<f64>,
}

impl Frame {
    pub fn new(samples: Array3<f64>) -> Self {
        Self { samples }
    }

    /// Number of receive antennas in this frame.
    pub fn num_antennas(&self) -> usize {
        self.samples.shape()[0]
    }

    /// Chirps per frame.
    pub fn num_chirps(&self) -> usize {
        self.samples.shape()[1]
    }

    /// ADC samples per chirp.
    pub fn num_samples(&self) -> usize {
        self.samples.shape()[2]
    }
}

// ============================================================================
// Presence
// ============================================================================

/// Occupancy state of the monitored zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum PresenceState {
    Present,
    #[default]
    Absent,
}

impl PresenceState {
    pub fn is_present(self) -> bool {
        matches!(self, PresenceState::Present)
    }
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceState::Present => write!(f, "Present"),
            PresenceState::Absent => write!(f, "Absent"),
        }
    }
}

// ============================================================================
// Output Events
// ============================================================================

/// Which physiological band an event refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VitalBand {
    Breathing,
    Heart,
}

impl std::fmt::Display for VitalBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VitalBand::Breathing => write!(f, "breathing"),
            VitalBand::Heart => write!(f, "heart"),
        }
    }
}

/// Notification pushed to the observer task.
///
/// Presence changes fire on every state transition; rate and amplitude
/// events fire each tick a valid estimate exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum OutputEvent {
    /// The occupancy state flipped.
    PresenceChanged {
        state: PresenceState,
        /// Seconds of the just-ended Present period (0 when entering
        /// Present). The accumulator restarts once reported.
        focused_secs: f64,
        timestamp: DateTime<Utc>,
    },
    /// A new smoothed rate estimate for one band (breaths or beats / min).
    Rate {
        band: VitalBand,
        bpm: f64,
        timestamp: DateTime<Utc>,
    },
    /// A new normalized breathing amplitude sample, scaled to 0-100.
    BreathingAmplitude {
        value: f64,
        timestamp: DateTime<Utc>,
    },
}

// ============================================================================
// Published Snapshot
// ============================================================================

/// Full published pipeline state.
///
/// A fresh snapshot is swapped in after every processed frame; readers get
/// a consistent view without locking the processing path.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VitalSignsSnapshot {
    /// Current occupancy state.
    pub presence: PresenceState,

    /// Seconds of the current Present period so far (0 while Absent).
    pub focused_secs: f64,

    /// Smoothed breathing rate (breaths/min), None until a valid estimate
    /// exists or while no subject is detected.
    pub breathing_bpm: Option<f64>,

    /// Smoothed heart rate (beats/min), None until a valid estimate exists.
    pub heart_bpm: Option<f64>,

    /// Rate variability: standard deviation of the breathing rate over the
    /// trailing variability window (breaths/min).
    pub breathing_variability: Option<f64>,

    /// Latest normalized breathing amplitude (0-100), None during cold start.
    pub breathing_amplitude: Option<f64>,

    /// Smoothed range bin currently tracked as the subject.
    pub tracked_bin: usize,

    /// Magnitude of the latest range profile (half spectrum).
    pub range_profile: Vec<f64>,

    /// Magnitude of the latest slow-time sample (I/Q envelope).
    pub envelope: f64,

    /// Wall-clock time of the last processed frame.
    pub updated_at: Option<DateTime<Utc>>,
}
