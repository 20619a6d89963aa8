//! Frames and the bounded hand-off queue.
//!
//! - `Frame`: one captured RGB bitmap, tagged with a monotonically increasing
//!   sequence number. Owned exclusively by whichever stage holds it; ownership
//!   moves through the queue.
//! - `FrameQueue`: the single shared structure between the acquisition loop
//!   and the consume loop. Bounded, FIFO, with bounded-wait push/pop so that
//!   neither side can block forever.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use image::RgbImage;

/// Default queue capacity when the configuration does not override it.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// One captured frame. Pixels are tightly packed RGB8.
#[derive(Debug)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture order. Strictly increasing per source.
    pub seq: u64,
    /// Monotonic capture instant.
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, seq: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            seq,
            captured_at: Instant::now(),
        }
    }

    /// Downscale by a fixed factor. Applied by the producer before enqueue to
    /// bound downstream cost. A factor of 1.0 is a no-op.
    pub fn downscale(self, factor: f32) -> Self {
        if !(factor > 0.0 && factor < 1.0) {
            return self;
        }
        let new_w = ((self.width as f32 * factor) as u32).max(1);
        let new_h = ((self.height as f32 * factor) as u32).max(1);
        let Some(img) = RgbImage::from_raw(self.width, self.height, self.pixels) else {
            // Pixel buffer did not match the declared dimensions. Drop the
            // payload rather than hand malformed data downstream.
            return Self {
                pixels: vec![0; (new_w * new_h * 3) as usize],
                width: new_w,
                height: new_h,
                seq: self.seq,
                captured_at: self.captured_at,
            };
        };
        let resized = image::imageops::resize(&img, new_w, new_h, image::imageops::Triangle);
        Self {
            pixels: resized.into_raw(),
            width: new_w,
            height: new_h,
            seq: self.seq,
            captured_at: self.captured_at,
        }
    }
}

struct QueueInner {
    frames: VecDeque<Frame>,
}

/// Bounded FIFO queue connecting the acquisition loop to the consume loop.
///
/// The producer parks with a bounded wait when full; the consumer parks with
/// a bounded wait when empty. Frames are never reordered and a successfully
/// enqueued frame is never dropped by the queue.
pub struct FrameQueue {
    inner: Mutex<QueueInner>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                frames: VecDeque::with_capacity(capacity),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.frames.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Wait until the queue has spare capacity, up to `timeout`.
    ///
    /// Returns true when capacity is available. A false return is not an
    /// error; the producer simply retries on its next iteration.
    pub fn wait_capacity(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let Ok(mut guard) = self.inner.lock() else {
            return false;
        };
        while guard.frames.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.not_full.wait_timeout(guard, deadline - now) {
                Ok((next, _)) => guard = next,
                Err(_) => return false,
            }
        }
        true
    }

    /// Enqueue with a bounded wait. On timeout the frame is handed back to
    /// the caller so it can retry without losing it.
    pub fn push_timeout(&self, frame: Frame, timeout: Duration) -> Result<(), Frame> {
        let deadline = Instant::now() + timeout;
        let Ok(mut guard) = self.inner.lock() else {
            return Err(frame);
        };
        while guard.frames.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(frame);
            }
            match self.not_full.wait_timeout(guard, deadline - now) {
                Ok((next, _)) => guard = next,
                Err(_) => return Err(frame),
            }
        }
        guard.frames.push_back(frame);
        drop(guard);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue with a bounded wait. Returns None on timeout.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Frame> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock().ok()?;
        while guard.frames.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            match self.not_empty.wait_timeout(guard, deadline - now) {
                Ok((next, _)) => guard = next,
                Err(_) => return None,
            }
        }
        let frame = guard.frames.pop_front();
        drop(guard);
        self.not_full.notify_one();
        frame
    }
}
