// src/main.rs - Replays pose recordings through the squat analyser
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use squat_analyser::{
    AnalysisSession, Clock, DataExporter, FeedbackEvent, ManualClock, PoseRecording, SessionConfig,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replays pose recordings through the squat analyser", long_about = None)]
struct Args {
    /// Session config file (JSON); missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (default: ~/Documents/SquatAnalyser)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Frame rate the recordings were captured at
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// JSON-lines pose recordings, one frame per line
    #[arg(required = true)]
    recordings: Vec<PathBuf>,
}

fn replay(index: usize, path: &Path, config: SessionConfig, output_dir: &Path, fps: f64) -> Result<PathBuf> {
    let mut source = PoseRecording::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let clock = ManualClock::new();
    let mut session = AnalysisSession::with_clock(config, Box::new(clock.clone()));
    let mut exporter = DataExporter::new(output_dir, Some(session_name(index, path)));
    let name = path.display().to_string();

    info!(recording = %name, session = %session.id(), "replaying");

    let mut frame = 0u64;
    loop {
        let timestamp = clock.now();
        let (events, success) = session.analyze(&mut source)?;
        if !success {
            break;
        }

        for event in &events {
            log_event(&name, event);
        }
        exporter.add_frame(frame, timestamp, &events);

        frame += 1;
        clock.advance(1.0 / fps);
    }

    if exporter.summaries().is_empty() {
        warn!(recording = %name, frames = frame, "no set was completed");
    }

    exporter.export_csv()?;
    exporter.export_summaries()?;
    Ok(exporter.session_dir())
}

// Index keeps same-named recordings from different directories apart
fn session_name(index: usize, path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    format!("{:02}_{}_{}", index + 1, stem, Local::now().format("%Y%m%d_%H%M%S"))
}

fn log_event(recording: &str, event: &FeedbackEvent) {
    match event {
        FeedbackEvent::SetStarted { .. } => info!(recording, "Set started"),
        FeedbackEvent::Feedback { message } => info!(recording, "Feedback: {}", message),
        FeedbackEvent::Tip { message } => info!(recording, "Tip: {}", message),
        FeedbackEvent::RepDetected { good, .. } => info!(recording, good, "Rep detected"),
        FeedbackEvent::SetEnded { reason, summary } => info!(
            recording,
            ?reason,
            good_reps = summary.good_reps,
            bad_reps = summary.bad_reps,
            "Set ended: {}",
            summary.final_comments
        ),
        FeedbackEvent::NotDetected { .. } | FeedbackEvent::SetStartCountdown { .. } => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if args.fps <= 0.0 {
        bail!("frame rate must be positive");
    }
    let config = match &args.config {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let output_dir = args.output.clone().unwrap_or_else(DataExporter::default_output_dir);

    // Each recording gets its own session; sessions share nothing
    let handles: Vec<_> = args
        .recordings
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, path)| {
            let config = config.clone();
            let output_dir = output_dir.clone();
            let fps = args.fps;
            tokio::task::spawn_blocking(move || {
                let result = replay(index, &path, config, &output_dir, fps);
                (path, result)
            })
        })
        .collect();

    let mut failures = 0;
    for handle in handles {
        match handle.await {
            Ok((path, Ok(dir))) => info!("{} exported to {}", path.display(), dir.display()),
            Ok((path, Err(e))) => {
                error!("{}: {:#}", path.display(), e);
                failures += 1;
            }
            Err(join_err) => {
                error!("replay task panicked: {}", join_err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} recording(s) failed", failures);
    }
    Ok(())
}
