//! Frame acquisition.
//!
//! This module provides the camera backends and the acquisition thread:
//! - `CameraSource`: synchronous frame capture from a configured source
//!   (`stub://` synthetic streams, `http(s)://` MJPEG or JPEG snapshots).
//! - `FrameSource`: the producer side of the pipeline. Runs a dedicated
//!   acquisition loop that captures, downscales, and enqueues frames into
//!   the bounded hand-off queue with backpressure.
//!
//! Capture failure is fatal to the stream by policy: the loop terminates and
//! the error is surfaced to the supervisor. There is no internal reconnect.

pub mod camera;
pub mod source;

pub use camera::{CameraConfig, CameraSource};
pub use source::{FrameSource, SourceStatus};
