//! Frame source abstraction for radar acquisition.
//!
//! Provides a unified trait for producing raw frames: a synthetic subject
//! simulator for development and tests, with the device SDK slot behind the
//! same trait. The producer task forwards frames into the pipeline queue
//! and owns the single fatal path: an unrecoverable acquisition fault
//! best-effort notifies the observer that the zone is empty, then cancels
//! the whole process.

use anyhow::Result;
use async_trait::async_trait;
use ndarray::Array3;
use rand::Rng;
use std::f64::consts::PI;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::RadarConfig;
use crate::types::{Frame, OutputEvent, PresenceState};

/// Events produced by a frame source.
pub enum FrameEvent {
    /// A raw frame was acquired.
    Frame(Frame),
    /// Source reached end of data (finite replay sources only).
    Eof,
}

/// Trait abstracting where raw frames come from.
///
/// Implementations handle device pacing internally; the producer task calls
/// [`next_frame`](FrameSource::next_frame) in a loop with cancellation.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Acquire the next frame.
    ///
    /// Returns `FrameEvent::Eof` when no more data is available.
    /// Returns `Err` on unrecoverable acquisition faults.
    async fn next_frame(&mut self) -> Result<FrameEvent>;

    /// Human-readable name for logging (e.g. "synthetic", "bgt60").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Simulates a breathing subject at a fixed distance.
///
/// Each frame carries a tone at the subject's range bin whose phase is
/// modulated by a breathing sinusoid, plus white noise. Frames are paced at
/// the configured frame rate.
pub struct SyntheticSource {
    num_antennas: usize,
    num_samples: usize,
    fft_size: usize,
    frame_period: std::time::Duration,
    /// Range bin of the simulated subject.
    subject_bin: usize,
    breathing_rate_hz: f64,
    noise_amplitude: f64,
    tick: u64,
    sample_rate: f64,
    /// Remaining frames, None for an endless source.
    remaining: Option<u64>,
}

impl SyntheticSource {
    pub fn new(config: &RadarConfig, remaining: Option<u64>) -> Self {
        let (start, stop) = config.object_bin_range();
        Self {
            num_antennas: config.device.num_antennas,
            num_samples: config.device.num_samples_per_chirp,
            fft_size: config.range_fft_size(),
            frame_period: std::time::Duration::from_secs_f64(1.0 / config.sample_rate_hz()),
            subject_bin: (start + stop) / 2,
            breathing_rate_hz: 0.3,
            noise_amplitude: 0.02,
            tick: 0,
            sample_rate: config.sample_rate_hz(),
            remaining,
        }
    }

    fn synthesize(&mut self) -> Frame {
        let t = self.tick as f64 / self.sample_rate;
        self.tick += 1;
        // Chest motion modulates the phase of the subject's range tone.
        let phase = 0.3 * (2.0 * PI * self.breathing_rate_hz * t).sin();
        let mut rng = rand::thread_rng();
        let mut samples = Array3::zeros((self.num_antennas, 1, self.num_samples));
        for ant in 0..self.num_antennas {
            for i in 0..self.num_samples {
                let carrier = 2.0 * PI * self.subject_bin as f64 * i as f64 / self.fft_size as f64;
                samples[[ant, 0, i]] =
                    (carrier + phase).cos() + rng.gen_range(-1.0..1.0) * self.noise_amplitude;
            }
        }
        Frame::new(samples)
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return Ok(FrameEvent::Eof);
            }
            *remaining -= 1;
        }
        tokio::time::sleep(self.frame_period).await;
        Ok(FrameEvent::Frame(self.synthesize()))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

// ============================================================================
// Producer Task
// ============================================================================

/// Forward frames from a source into the pipeline queue.
///
/// On an unrecoverable acquisition fault this best-effort notifies the
/// observer that presence is Absent (failures are swallowed) and cancels
/// the whole process. This is the single fatal path in the system.
pub async fn run_producer<S: FrameSource>(
    mut source: S,
    frames: mpsc::Sender<Frame>,
    events: mpsc::UnboundedSender<OutputEvent>,
    cancel: CancellationToken,
) {
    info!(source = source.source_name(), "Frame producer started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match source.next_frame().await {
            Ok(FrameEvent::Frame(frame)) => {
                if frames.send(frame).await.is_err() {
                    info!("Frame queue closed, producer stopping");
                    break;
                }
            }
            Ok(FrameEvent::Eof) => {
                info!(source = source.source_name(), "Frame source exhausted");
                cancel.cancel();
                break;
            }
            Err(e) => {
                error!(source = source.source_name(), error = %e, "Acquisition fault, shutting down");
                // Best-effort: tell the observer the zone is empty before
                // the process goes down. A closed channel is ignored.
                let _ = events.send(OutputEvent::PresenceChanged {
                    state: PresenceState::Absent,
                    focused_secs: 0.0,
                    timestamp: chrono::Utc::now(),
                });
                cancel.cancel();
                break;
            }
        }
    }
    info!("Frame producer stopped");
}
