//! Camera backends.
//!
//! `CameraSource` hides the concrete capture mechanism behind a backend enum
//! selected by the source URI scheme:
//!
//! - `stub://` — synthetic frames for tests and demos. The query string can
//!   carry `frames=N` to simulate device loss after N captures.
//! - `http://` / `https://` — MJPEG streams or single-JPEG snapshot
//!   endpoints, decoded in memory.
//!
//! Device indexes and other schemes are rejected: this crate requires a
//! source that supports synchronous reads over one of the above transports.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::{Duration, Instant};

use url::Url;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

/// Captured pixels before they become a sequenced `Frame`.
#[derive(Debug)]
pub struct CapturedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Source URI. Supported schemes: stub://, http://, https://.
    pub source: String,
    /// Target frame rate. Network sources decimate to this rate.
    pub target_fps: u32,
    /// Frame width for synthetic sources.
    pub width: u32,
    /// Frame height for synthetic sources.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "stub://front_door".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// A camera device supporting synchronous frame reads.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    Http(HttpCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let backend = if config.source.starts_with("stub://") {
            CameraBackend::Synthetic(SyntheticCamera::new(config)?)
        } else {
            let url = Url::parse(&config.source).context("parse camera source")?;
            match url.scheme() {
                "http" | "https" => CameraBackend::Http(HttpCamera::new(config)),
                other => {
                    return Err(anyhow!(
                        "unsupported camera scheme '{}'; expected stub:// or http(s)://",
                        other
                    ))
                }
            }
        };
        Ok(Self { backend })
    }

    /// Open the device / connect to the stream.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(cam) => cam.connect(),
            CameraBackend::Http(cam) => cam.connect(),
        }
    }

    /// Capture one frame. An error here means the stream is lost.
    pub fn capture(&mut self) -> Result<CapturedImage> {
        match &mut self.backend {
            CameraBackend::Synthetic(cam) => cam.capture(),
            CameraBackend::Http(cam) => cam.capture(),
        }
    }

    pub fn describe(&self) -> &str {
        match &self.backend {
            CameraBackend::Synthetic(cam) => &cam.config.source,
            CameraBackend::Http(cam) => &cam.config.source,
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://)
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
    /// Simulated scene state so consecutive frames differ slightly.
    scene_state: u8,
    /// When set, capture fails after this many frames (simulated device loss).
    frames_before_loss: Option<u64>,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Result<Self> {
        let frames_before_loss = parse_frames_param(&config.source)?;
        Ok(Self {
            config,
            frame_count: 0,
            scene_state: 0,
            frames_before_loss,
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("camera connected to {} (synthetic)", self.config.source);
        Ok(())
    }

    fn capture(&mut self) -> Result<CapturedImage> {
        if let Some(limit) = self.frames_before_loss {
            if self.frame_count >= limit {
                return Err(anyhow!(
                    "camera read failed: device disconnected after {} frames",
                    limit
                ));
            }
        }
        self.frame_count += 1;
        if self.frame_count.is_multiple_of(50) {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        let jitter: u8 = rand::random();
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64 + jitter as u64)
                % 256) as u8;
        }

        Ok(CapturedImage {
            pixels,
            width: self.config.width,
            height: self.config.height,
        })
    }
}

/// Parse `frames=N` from a stub:// query string, if present.
fn parse_frames_param(source: &str) -> Result<Option<u64>> {
    let Ok(url) = Url::parse(source) else {
        return Ok(None);
    };
    for (key, value) in url.query_pairs() {
        if key == "frames" {
            let n: u64 = value
                .parse()
                .map_err(|_| anyhow!("stub camera 'frames' must be an integer"))?;
            return Ok(Some(n));
        }
    }
    Ok(None)
}

// ----------------------------------------------------------------------------
// HTTP camera (MJPEG or single-JPEG snapshots)
// ----------------------------------------------------------------------------

struct HttpCamera {
    config: CameraConfig,
    stream: Option<HttpStream>,
    last_frame_at: Option<Instant>,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    SingleJpeg,
}

impl HttpCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            stream: None,
            last_frame_at: None,
        }
    }

    fn connect(&mut self) -> Result<()> {
        let response = ureq::get(&self.config.source)
            .call()
            .context("connect to http camera")?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            let reader = response.into_reader();
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(reader)));
        } else {
            self.stream = Some(HttpStream::SingleJpeg);
        }
        log::info!("camera connected to {}", self.config.source);
        Ok(())
    }

    fn capture(&mut self) -> Result<CapturedImage> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("http camera not connected; call connect() first"))?;
        let min_interval = frame_interval(self.config.target_fps);
        loop {
            let jpeg_bytes = match stream {
                HttpStream::Mjpeg(stream) => stream.read_next_jpeg(),
                HttpStream::SingleJpeg => fetch_single_jpeg(&self.config.source),
            }?;

            let now = Instant::now();
            if let Some(last) = self.last_frame_at {
                if now.duration_since(last) < min_interval {
                    continue;
                }
            }
            self.last_frame_at = Some(now);

            let (pixels, width, height) = decode_jpeg(&jpeg_bytes)?;
            return Ok(CapturedImage {
                pixels,
                width,
                height,
            });
        }
    }
}

struct MjpegStream {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn fetch_single_jpeg(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch jpeg snapshot from {}", url))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .context("read jpeg snapshot")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg snapshot"));
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let image = image::load_from_memory(bytes).context("decode jpeg")?;
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    Ok((rgb.into_raw(), width, height))
}

/// Locate one complete JPEG (SOI..EOI) in a byte buffer.
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let end = buffer[start + 2..]
        .windows(2)
        .position(|w| w == [0xFF, 0xD9])?;
    Some((start, start + 2 + end + 2))
}

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}
