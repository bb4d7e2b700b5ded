//! Occupancy detection from the range profile.
//!
//! The peak range-profile magnitude inside the object-distance window is
//! smoothed with an exponential moving average and compared against a fixed
//! threshold. A short hysteresis ring suppresses flicker: the detector may
//! declare Absent only once the trailing window contains no Present reading,
//! while transitions to Present take effect immediately.

use std::time::Instant;

use crate::buffer::RingBuffer;
use crate::config::defaults::{PRESENCE_EMA_SPAN, PRESENCE_MAX_BUFFER_SIZE};
use crate::types::PresenceState;

/// A state transition reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceTransition {
    pub state: PresenceState,
    /// Seconds of the just-ended Present period (0 when entering Present).
    pub focused_secs: f64,
}

/// Smooths range-gated energy and applies hysteresis to declare occupancy.
pub struct PresenceDetector {
    /// Recent raw window maxima, kept for inspection and debugging.
    max_history: RingBuffer<f64>,
    ema: Option<f64>,
    alpha: f64,
    threshold: f64,
    /// Instantaneous readings over the hysteresis window.
    hysteresis: RingBuffer<bool>,
    bin_start: usize,
    bin_stop: usize,
    state: PresenceState,
    /// Start of the current Present period.
    present_since: Option<Instant>,
    last_change: Option<Instant>,
}

impl PresenceDetector {
    /// `bin_range` is the object-distance window in range-profile bins,
    /// `hysteresis_len` the ring capacity in frames.
    pub fn new(bin_range: (usize, usize), threshold: f64, hysteresis_len: usize) -> Self {
        Self {
            max_history: RingBuffer::new(PRESENCE_MAX_BUFFER_SIZE),
            ema: None,
            alpha: 2.0 / (PRESENCE_EMA_SPAN as f64 + 1.0),
            threshold,
            hysteresis: RingBuffer::new(hysteresis_len.max(1)),
            bin_start: bin_range.0,
            bin_stop: bin_range.1,
            state: PresenceState::Absent,
            present_since: None,
            last_change: None,
        }
    }

    /// Current occupancy state.
    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Seconds of the current Present period so far (0 while Absent).
    pub fn focused_secs(&self, now: Instant) -> f64 {
        self.present_since
            .map(|since| now.duration_since(since).as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Consume one range-profile magnitude vector. Returns a transition
    /// when the occupancy state flips, `None` otherwise.
    pub fn process_at(&mut self, range_profile: &[f64], now: Instant) -> Option<PresenceTransition> {
        let stop = self.bin_stop.min(range_profile.len());
        let start = self.bin_start.min(stop);
        let window_max = range_profile[start..stop]
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        self.max_history.push(window_max);

        let ema = match self.ema {
            None => window_max,
            Some(prev) => self.alpha * window_max + (1.0 - self.alpha) * prev,
        };
        self.ema = Some(ema);

        let instantaneous = ema > self.threshold;
        self.hysteresis.push(instantaneous);

        // Absent only once the whole hysteresis window agrees.
        let effective = if !instantaneous && self.hysteresis.iter().any(|&p| p) {
            PresenceState::Present
        } else if instantaneous {
            PresenceState::Present
        } else {
            PresenceState::Absent
        };

        if effective == self.state {
            return None;
        }
        self.state = effective;
        self.last_change = Some(now);

        let focused_secs = match effective {
            PresenceState::Present => {
                self.present_since = Some(now);
                0.0
            }
            PresenceState::Absent => {
                let focused = self.focused_secs(now);
                self.present_since = None;
                focused
            }
        };
        Some(PresenceTransition {
            state: effective,
            focused_secs,
        })
    }

    /// Smoothed energy value, for snapshots and tests.
    pub fn ema(&self) -> Option<f64> {
        self.ema
    }

    /// Drop the smoothing and hysteresis history. Occupancy state and the
    /// focused-time accumulator survive; only the energy statistics restart
    /// from cold.
    pub fn reset(&mut self) {
        self.max_history.clear();
        self.hysteresis.clear();
        self.ema = None;
    }
}
