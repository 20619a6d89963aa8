//! The acquisition producer.
//!
//! `FrameSource` owns the acquisition thread. Each iteration waits for queue
//! capacity (bounded wait, no busy-spin), captures one frame, downscales it,
//! and enqueues it. Capture failure terminates the loop and is surfaced via
//! `status()` for the supervisor to act on; the device handle is released
//! exactly once when the thread drops the camera.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::frame::{Frame, FrameQueue};
use crate::ingest::camera::CameraSource;

/// Bounded wait used for capacity checks and enqueue retries.
const ACQUIRE_POLL: Duration = Duration::from_millis(10);

/// Producer-side status, shared with the consume loop.
#[derive(Clone, Debug, Default)]
pub struct SourceStatus {
    pub running: bool,
    pub frames_captured: u64,
    /// Set when the acquisition loop terminated on a capture error.
    pub failure: Option<String>,
}

pub struct FrameSource {
    camera: Option<CameraSource>,
    queue: Arc<FrameQueue>,
    downscale: f32,
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<SourceStatus>>,
    handle: Option<JoinHandle<()>>,
}

impl FrameSource {
    pub fn new(camera: CameraSource, queue: Arc<FrameQueue>, downscale: f32) -> Self {
        Self {
            camera: Some(camera),
            queue,
            downscale,
            stop: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(SourceStatus::default())),
            handle: None,
        }
    }

    /// Connect the camera and spawn the acquisition loop.
    pub fn start(&mut self) -> Result<()> {
        let mut camera = self
            .camera
            .take()
            .ok_or_else(|| anyhow!("frame source already started"))?;
        camera.connect()?;

        let queue = Arc::clone(&self.queue);
        let stop = Arc::clone(&self.stop);
        let status = Arc::clone(&self.status);
        let downscale = self.downscale;

        if let Ok(mut guard) = status.lock() {
            guard.running = true;
        }

        let handle = std::thread::Builder::new()
            .name("frame-acquisition".into())
            .spawn(move || {
                acquisition_loop(&mut camera, &queue, downscale, &stop, &status);
                // Camera drops here: device handle released exactly once,
                // whether the loop ended on stop() or on a capture error.
            })
            .map_err(|e| anyhow!("spawn acquisition thread: {}", e))?;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn status(&self) -> SourceStatus {
        self.status
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Capture error, if the acquisition loop terminated on one.
    pub fn failure(&self) -> Option<String> {
        self.status().failure
    }

    /// Signal the loop to stop and join it. Idempotent; safe to call whether
    /// or not the loop already terminated on its own.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("acquisition thread panicked");
            }
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn acquisition_loop(
    camera: &mut CameraSource,
    queue: &FrameQueue,
    downscale: f32,
    stop: &AtomicBool,
    status: &Mutex<SourceStatus>,
) {
    let mut seq: u64 = 0;
    // A frame that timed out on enqueue is held here and retried; the queue
    // never loses a captured frame and capture order is preserved.
    let mut pending: Option<Frame> = None;

    log::info!("acquisition loop started ({})", camera.describe());

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        if let Some(frame) = pending.take() {
            if let Err(frame) = queue.push_timeout(frame, ACQUIRE_POLL) {
                pending = Some(frame);
            }
            continue;
        }

        // Backpressure: park until the queue has room, then capture.
        if !queue.wait_capacity(ACQUIRE_POLL) {
            continue;
        }

        let captured = match camera.capture() {
            Ok(captured) => captured,
            Err(e) => {
                log::error!("frame capture failed: {}", e);
                if let Ok(mut guard) = status.lock() {
                    guard.failure = Some(e.to_string());
                }
                break;
            }
        };

        seq += 1;
        let frame =
            Frame::new(captured.pixels, captured.width, captured.height, seq).downscale(downscale);

        if let Ok(mut guard) = status.lock() {
            guard.frames_captured = seq;
        }

        if let Err(frame) = queue.push_timeout(frame, ACQUIRE_POLL) {
            pending = Some(frame);
        }
    }

    if let Ok(mut guard) = status.lock() {
        guard.running = false;
    }
    log::info!("acquisition loop stopped after {} frames", seq);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::camera::CameraConfig;

    fn stub_camera(source: &str) -> CameraSource {
        CameraSource::new(CameraConfig {
            source: source.into(),
            target_fps: 0,
            width: 16,
            height: 16,
        })
        .unwrap()
    }

    #[test]
    fn produces_sequenced_frames_into_queue() {
        let queue = Arc::new(FrameQueue::new(4));
        let mut source = FrameSource::new(stub_camera("stub://test"), Arc::clone(&queue), 0.5);
        source.start().unwrap();

        let first = queue.pop_timeout(Duration::from_secs(1)).unwrap();
        let second = queue.pop_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        // Downscaled by 0.5 before enqueue.
        assert_eq!(first.width, 8);
        assert_eq!(first.height, 8);

        source.stop();
    }

    #[test]
    fn stalls_at_capacity_without_dropping() {
        let queue = Arc::new(FrameQueue::new(3));
        let mut source = FrameSource::new(stub_camera("stub://test"), Arc::clone(&queue), 1.0);
        source.start().unwrap();

        // Give the producer time to fill the queue and hit backpressure.
        std::thread::sleep(Duration::from_millis(100));
        assert!(queue.len() <= 3);

        // Frames drain in capture order with no gaps.
        let mut last_seq = 0;
        for _ in 0..6 {
            let frame = queue.pop_timeout(Duration::from_secs(1)).unwrap();
            assert_eq!(frame.seq, last_seq + 1);
            last_seq = frame.seq;
        }
        source.stop();
    }

    #[test]
    fn capture_failure_surfaces_to_caller() {
        let queue = Arc::new(FrameQueue::new(16));
        let mut source =
            FrameSource::new(stub_camera("stub://test?frames=3"), Arc::clone(&queue), 1.0);
        source.start().unwrap();

        // Wait for the loop to exhaust the scripted frames and fail.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while source.failure().is_none() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        let status = source.status();
        assert!(status.failure.is_some());
        assert!(!status.running);
        assert_eq!(status.frames_captured, 3);
        source.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let queue = Arc::new(FrameQueue::new(4));
        let mut source = FrameSource::new(stub_camera("stub://test"), Arc::clone(&queue), 1.0);
        source.start().unwrap();
        source.stop();
        source.stop();
        assert!(!source.status().running);
    }

    #[test]
    fn start_twice_is_an_error() {
        let queue = Arc::new(FrameQueue::new(4));
        let mut source = FrameSource::new(stub_camera("stub://test"), Arc::clone(&queue), 1.0);
        source.start().unwrap();
        assert!(source.start().is_err());
        source.stop();
    }
}
