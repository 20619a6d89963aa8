//! Pipeline supervisor.
//!
//! Owns the consume loop: dequeue frames from the bounded queue, apply the
//! frame-skip policy, run detection and matching, gate greetings/reports
//! through the throttle, and dispatch authorized reports. Also polls the
//! fingerprint store for staleness and hot-reloads it, resetting cooldowns
//! on success.
//!
//! Lifecycle is `Idle -> Running -> Stopped`, with `Stopped` terminal.
//! Failure policy:
//! - camera loss (surfaced by the frame source) stops the pipeline;
//! - per-frame extraction failures skip that frame's recognition;
//! - report delivery failures are logged and discarded;
//! - reload failures keep the previous snapshot and retry next poll.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::frame::FrameQueue;
use crate::ingest::FrameSource;
use crate::model::FingerprintStore;
use crate::recognize::{FaceOracle, MatchEngine, MatchedIdentity};
use crate::throttle::ThrottleController;
use crate::transport::{encode_snapshot_jpeg, AccessEvent, ReportSink};

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Process every Kth dequeued frame. 1 processes everything.
    pub frame_skip: u32,
    /// How often to check the model artifact for changes.
    pub staleness_poll: Duration,
    /// Bounded wait for an empty queue before re-checking liveness.
    pub idle_wait: Duration,
    /// Reported as `camera_location` on every access event.
    pub camera_location: String,
    /// Attach a JPEG snapshot of the matched frame to reports.
    pub attach_snapshot: bool,
    /// Interval between periodic throughput log lines.
    pub health_log_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_skip: 2,
            staleness_poll: Duration::from_secs(30),
            idle_wait: Duration::from_millis(10),
            camera_location: "Main Entrance Camera 1".to_string(),
            attach_snapshot: false,
            health_log_interval: Duration::from_secs(5),
        }
    }
}

/// Running throughput counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    pub frames_seen: u64,
    pub frames_processed: u64,
    pub faces_detected: u64,
    pub faces_recognized: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopped,
}

pub struct PipelineSupervisor {
    config: PipelineConfig,
    store: FingerprintStore,
    engine: MatchEngine,
    throttle: ThrottleController,
    stats: PipelineStats,
    state: PipelineState,
}

impl PipelineSupervisor {
    pub fn new(
        config: PipelineConfig,
        store: FingerprintStore,
        engine: MatchEngine,
        throttle: ThrottleController,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            throttle,
            stats: PipelineStats::default(),
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Start the frame source and run the consume loop until `shutdown` is
    /// set or the camera stream is lost. Returns an error only for the
    /// fatal case (acquisition failure); a requested shutdown is Ok.
    ///
    /// The pipeline drains frames already queued before reporting a camera
    /// loss, so nothing successfully captured is thrown away.
    pub fn start(
        &mut self,
        source: &mut FrameSource,
        queue: &FrameQueue,
        oracle: &mut dyn FaceOracle,
        sink: &mut dyn ReportSink,
        shutdown: &AtomicBool,
    ) -> Result<()> {
        if self.state != PipelineState::Idle {
            return Err(anyhow!("pipeline cannot start from {:?} state", self.state));
        }
        source.start()?;
        self.state = PipelineState::Running;
        log::info!(
            "pipeline running: frame_skip={}, tolerance={}, min_confidence={}, oracle={}",
            self.config.frame_skip,
            self.engine.config().tolerance,
            self.engine.config().min_confidence,
            oracle.name()
        );

        let frame_skip = self.config.frame_skip.max(1) as u64;
        let mut snapshot = self.store.snapshot();
        let mut last_poll = Instant::now();
        let mut last_health = Instant::now();

        let outcome = loop {
            if shutdown.load(Ordering::SeqCst) {
                log::info!("shutdown requested");
                break Ok(());
            }

            // (1) Model staleness poll; reload resets all cooldowns.
            if last_poll.elapsed() >= self.config.staleness_poll {
                last_poll = Instant::now();
                if self.store.is_stale() {
                    match self.store.load() {
                        Ok(()) => {
                            self.throttle.reset();
                            snapshot = self.store.snapshot();
                            log::info!(
                                "model reloaded ({} identities); cooldowns reset",
                                snapshot.identity_count()
                            );
                        }
                        Err(e) => {
                            log::warn!("model reload failed, keeping previous snapshot: {}", e);
                        }
                    }
                }
            }

            // (2) Dequeue with a bounded wait. An empty queue plus a dead
            // source means the stream is lost for good.
            let Some(frame) = queue.pop_timeout(self.config.idle_wait) else {
                if let Some(failure) = source.failure() {
                    if queue.is_empty() {
                        break Err(anyhow!("camera stream lost: {}", failure));
                    }
                }
                continue;
            };
            self.stats.frames_seen += 1;

            if last_health.elapsed() >= self.config.health_log_interval {
                last_health = Instant::now();
                log::info!(
                    "pipeline: seen={} processed={} detected={} recognized={}",
                    self.stats.frames_seen,
                    self.stats.frames_processed,
                    self.stats.faces_detected,
                    self.stats.faces_recognized
                );
            }

            // (3) Frame-skip policy. Skipped frames pass through untouched.
            if !self.stats.frames_seen.is_multiple_of(frame_skip) {
                continue;
            }
            self.stats.frames_processed += 1;

            // (4) Detect, match, throttle, dispatch.
            let results = match self.engine.recognize(oracle, &frame, &snapshot) {
                Ok(results) => results,
                Err(e) => {
                    log::warn!("face extraction failed for frame {}: {}", frame.seq, e);
                    continue;
                }
            };

            for result in results {
                self.stats.faces_detected += 1;
                let Some(identity) = result.identity else {
                    continue;
                };
                self.stats.faces_recognized += 1;

                let decision = self.throttle.evaluate(identity.id, Instant::now());
                if decision.greet {
                    greet(&identity, result.confidence);
                }
                if decision.report {
                    let snapshot_jpeg = if self.config.attach_snapshot {
                        match encode_snapshot_jpeg(&frame) {
                            Ok(jpeg) => Some(jpeg),
                            Err(e) => {
                                log::warn!("snapshot encode failed: {}", e);
                                None
                            }
                        }
                    } else {
                        None
                    };
                    let event = AccessEvent {
                        customer_id: identity.id,
                        confidence: result.confidence,
                        camera_location: self.config.camera_location.clone(),
                        snapshot_jpeg,
                    };
                    if sink.report(&event) {
                        log::info!(
                            "access event dispatched for {} (id {})",
                            identity.display_name,
                            identity.id
                        );
                    }
                    // Delivery failure is already logged by the sink; the
                    // window stays consumed either way.
                }
            }
        };

        self.finish(source);
        outcome
    }

    fn finish(&mut self, source: &mut FrameSource) {
        self.state = PipelineState::Stopped;
        source.stop();
        log::info!(
            "pipeline stopped: seen={} processed={} detected={} recognized={}",
            self.stats.frames_seen,
            self.stats.frames_processed,
            self.stats.faces_detected,
            self.stats.faces_recognized
        );
    }
}

fn greet(identity: &MatchedIdentity, confidence: f32) {
    let line = "=".repeat(60);
    println!("\n{}", line);
    println!("WELCOME {}!", identity.display_name.to_uppercase());
    println!(
        "User ID: {} | confidence {:.1}%",
        identity.id,
        confidence * 100.0
    );
    println!("{}\n", line);
    log::info!(
        "recognized {} (id {}, confidence {:.1}%)",
        identity.display_name,
        identity.id,
        confidence * 100.0
    );
}
