//! sentryd - real-time face recognition daemon
//!
//! This daemon:
//! 1. Loads the fingerprint model (fatal if absent; train first)
//! 2. Starts the camera acquisition loop with a bounded frame queue
//! 3. Runs the recognition pipeline: match, throttle, report
//! 4. Hot-reloads the model when the artifact changes on disk
//! 5. Stops cleanly on Ctrl-C with a final stats summary

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gate_sentry::{
    AccessReporter, CameraConfig, CameraSource, FingerprintStore, FrameQueue, FrameSource,
    MatchConfig, MatchEngine, PipelineConfig, PipelineSupervisor, SentryConfig, StubOracle,
    ThrottleConfig, ThrottleController,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = SentryConfig::load()?;

    let mut store = FingerprintStore::new(&cfg.model.path);
    store
        .load()
        .context("model could not be loaded; run train_model first")?;

    let camera = CameraSource::new(CameraConfig {
        source: cfg.camera.source.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })?;
    let queue = Arc::new(FrameQueue::new(cfg.queue_capacity));
    let mut source = FrameSource::new(camera, Arc::clone(&queue), cfg.downscale);

    let engine = MatchEngine::new(MatchConfig {
        tolerance: cfg.recognition.tolerance,
        min_confidence: cfg.recognition.min_confidence,
    });
    let throttle = ThrottleController::new(ThrottleConfig {
        greeting_cooldown: cfg.cooldowns.greeting,
        report_cooldown: cfg.cooldowns.report,
    });
    let mut sink = AccessReporter::new(&cfg.access_log.base_url, cfg.access_log.timeout);

    // The biometric oracle is an external capability; the built-in stub is
    // the only backend shipped with this crate.
    let mut oracle = StubOracle::new();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("install Ctrl-C handler")?;

    let mut supervisor = PipelineSupervisor::new(
        PipelineConfig {
            frame_skip: cfg.recognition.frame_skip,
            staleness_poll: cfg.model.poll_interval,
            camera_location: cfg.access_log.camera_location.clone(),
            attach_snapshot: cfg.access_log.attach_snapshot,
            ..PipelineConfig::default()
        },
        store,
        engine,
        throttle,
    );

    log::info!("sentryd starting");
    log::info!(
        "camera={} queue_capacity={} model={} access_log={}",
        cfg.camera.source,
        cfg.queue_capacity,
        cfg.model.path,
        cfg.access_log.base_url
    );

    supervisor.start(&mut source, &queue, &mut oracle, &mut sink, &shutdown)?;

    let stats = supervisor.stats();
    println!();
    println!("{}", "=".repeat(60));
    println!("RECOGNITION SESSION STATS");
    println!("{}", "=".repeat(60));
    println!("Frames seen:      {}", stats.frames_seen);
    println!("Frames processed: {}", stats.frames_processed);
    println!("Faces detected:   {}", stats.faces_detected);
    println!("Faces recognized: {}", stats.faces_recognized);
    println!("{}", "=".repeat(60));

    Ok(())
}
