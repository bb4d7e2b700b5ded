//! radar-vitals - FMCW Radar Vital-Signs Monitor
//!
//! Streaming vital-signs monitor for 60 GHz FMCW radar: breathing rate,
//! heart rate, presence, and a normalized breathing-amplitude indicator.
//!
//! # Usage
//!
//! ```bash
//! # Run against the built-in synthetic subject
//! cargo run --release
//!
//! # Run a finite number of frames then exit
//! cargo run --release -- --frames 2400
//!
//! # Point at a custom config file
//! RADAR_VITALS_CONFIG=./bench.toml cargo run --release
//! ```
//!
//! # Environment Variables
//!
//! - `RADAR_VITALS_CONFIG`: Path to TOML configuration file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use radar_vitals::config;
use radar_vitals::pipeline::source::{run_producer, SyntheticSource};
use radar_vitals::pipeline::PipelineController;
use radar_vitals::types::{Frame, OutputEvent};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "radar-vitals")]
#[command(about = "FMCW Radar Vital-Signs Monitor")]
#[command(version)]
struct CliArgs {
    /// Stop after this many frames (default: run until Ctrl+C)
    #[arg(long)]
    frames: Option<u64>,

    /// Path to TOML configuration file (overrides RADAR_VITALS_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Emit output events as JSON lines instead of log lines
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    FrameProducer,
    Pipeline,
    EventObserver,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::FrameProducer => write!(f, "FrameProducer"),
            TaskName::Pipeline => write!(f, "Pipeline"),
            TaskName::EventObserver => write!(f, "EventObserver"),
        }
    }
}

// ============================================================================
// Event Observer
// ============================================================================

/// Drain the output event channel and report every event.
///
/// Runs until the channel closes (producer and pipeline both gone) or the
/// cancellation token fires.
async fn run_observer(
    mut events: mpsc::UnboundedReceiver<OutputEvent>,
    json: bool,
    cancel_token: CancellationToken,
) -> Result<TaskName> {
    info!("[EventObserver] Task starting");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                // Drain whatever is already queued before exiting.
                while let Ok(event) = events.try_recv() {
                    report_event(&event, json)?;
                }
                info!("[EventObserver] Received shutdown signal");
                return Ok(TaskName::EventObserver);
            }
            event = events.recv() => {
                match event {
                    Some(event) => report_event(&event, json)?,
                    None => {
                        info!("[EventObserver] Event channel closed");
                        return Ok(TaskName::EventObserver);
                    }
                }
            }
        }
    }
}

fn report_event(event: &OutputEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        OutputEvent::PresenceChanged {
            state,
            focused_secs,
            timestamp,
        } => {
            info!(
                "👤 Presence: {} (focused {:.0}s) at {}",
                state, focused_secs, timestamp
            );
        }
        OutputEvent::Rate {
            band,
            bpm,
            timestamp,
        } => {
            info!("💓 {} rate: {:.0} bpm at {}", band, bpm, timestamp);
        }
        OutputEvent::BreathingAmplitude { value, timestamp } => {
            info!("🫁 Breathing amplitude: {:.1} at {}", value, timestamp);
        }
    }
    Ok(())
}

// ============================================================================
// Supervisor
// ============================================================================

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // Load radar configuration
    let radar_config = match &args.config {
        Some(path) => config::RadarConfig::load_from_file(std::path::Path::new(path))?,
        None => config::RadarConfig::load(),
    };
    config::init(radar_config);
    let cfg = config::get();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  radar-vitals - FMCW Radar Vital-Signs Monitor");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    info!(
        "  Frame rate: {:.0} Hz | Antennas: {} | Samples/chirp: {}",
        cfg.device.frame_rate_hz, cfg.device.num_antennas, cfg.device.num_samples_per_chirp
    );
    info!(
        "  Target window: {:.2}-{:.2} m (bins {}-{}) | Strategy: {:?}",
        cfg.target.object_distance_start_m,
        cfg.target.object_distance_stop_m,
        cfg.object_bin_range().0,
        cfg.object_bin_range().1,
        cfg.target.strategy,
    );
    info!(
        "  Bands: breathing {:.2}-{:.2} Hz | heart {:.2}-{:.2} Hz",
        cfg.bands.breathing.low_hz,
        cfg.bands.breathing.high_hz,
        cfg.bands.heart.low_hz,
        cfg.bands.heart.high_hz,
    );
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // Channels: bounded frame queue, unbounded output events
    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(64);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<OutputEvent>();

    let controller = PipelineController::new(cfg, event_tx.clone())?;

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: Frame producer (synthetic subject)
    let source = SyntheticSource::new(cfg, args.frames);
    if let Some(n) = args.frames {
        info!("📡 Input: synthetic subject ({} frames)", n);
    } else {
        info!("📡 Input: synthetic subject (continuous)");
    }
    let producer_cancel = cancel_token.clone();
    task_set.spawn(async move {
        info!("[FrameProducer] Task starting");
        run_producer(source, frame_tx, event_tx, producer_cancel).await;
        Ok(TaskName::FrameProducer)
    });

    // Task 2: Pipeline
    let pipeline_cancel = cancel_token.clone();
    task_set.spawn(async move {
        info!("[Pipeline] Task starting");
        controller.run(frame_rx, pipeline_cancel).await;
        Ok(TaskName::Pipeline)
    });

    // Task 3: Event observer
    let observer_cancel = cancel_token.clone();
    let json = args.json;
    task_set.spawn(async move { run_observer(event_rx, json, observer_cancel).await });

    run_supervisor(&mut task_set, cancel_token).await?;

    info!("");
    info!("✓ radar-vitals shutdown complete");
    Ok(())
}
