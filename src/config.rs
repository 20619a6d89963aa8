use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CAMERA_SOURCE: &str = "stub://front_door";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_QUEUE_CAPACITY: usize = 32;
const DEFAULT_DOWNSCALE: f32 = 0.5;
const DEFAULT_TOLERANCE: f32 = 0.6;
const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
const DEFAULT_FRAME_SKIP: u32 = 2;
const DEFAULT_GREETING_COOLDOWN_SECS: u64 = 5;
const DEFAULT_REPORT_COOLDOWN_SECS: u64 = 300;
const DEFAULT_MODEL_PATH: &str = "face_model.json";
const DEFAULT_MODEL_POLL_SECS: u64 = 30;
const DEFAULT_ACCESS_LOG_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_ACCESS_LOG_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CAMERA_LOCATION: &str = "Main Entrance Camera 1";
const DEFAULT_DIRECTORY_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 3;
const DEFAULT_THUMBNAIL_MAX: u32 = 512;

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    camera: Option<CameraConfigFile>,
    queue_capacity: Option<usize>,
    downscale: Option<f32>,
    recognition: Option<RecognitionConfigFile>,
    cooldowns: Option<CooldownConfigFile>,
    model: Option<ModelConfigFile>,
    access_log: Option<AccessLogConfigFile>,
    directory: Option<DirectoryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    source: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RecognitionConfigFile {
    tolerance: Option<f32>,
    min_confidence: Option<f32>,
    frame_skip: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CooldownConfigFile {
    greeting_secs: Option<u64>,
    report_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<String>,
    poll_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct AccessLogConfigFile {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    camera_location: Option<String>,
    attach_snapshot: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DirectoryConfigFile {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    thumbnail_max: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub camera: CameraSettings,
    pub queue_capacity: usize,
    pub downscale: f32,
    pub recognition: RecognitionSettings,
    pub cooldowns: CooldownSettings,
    pub model: ModelSettings,
    pub access_log: AccessLogSettings,
    pub directory: DirectorySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub source: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct RecognitionSettings {
    pub tolerance: f32,
    pub min_confidence: f32,
    pub frame_skip: u32,
}

#[derive(Debug, Clone)]
pub struct CooldownSettings {
    pub greeting: Duration,
    pub report: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: String,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AccessLogSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub camera_location: String,
    pub attach_snapshot: bool,
}

#[derive(Debug, Clone)]
pub struct DirectorySettings {
    pub base_url: String,
    pub timeout: Duration,
    pub thumbnail_max: u32,
}

impl SentryConfig {
    /// Load from the file named by `SENTRY_CONFIG` (if set), then apply
    /// `SENTRY_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let camera = CameraSettings {
            source: file
                .camera
                .as_ref()
                .and_then(|camera| camera.source.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_SOURCE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let recognition = RecognitionSettings {
            tolerance: file
                .recognition
                .as_ref()
                .and_then(|r| r.tolerance)
                .unwrap_or(DEFAULT_TOLERANCE),
            min_confidence: file
                .recognition
                .as_ref()
                .and_then(|r| r.min_confidence)
                .unwrap_or(DEFAULT_MIN_CONFIDENCE),
            frame_skip: file
                .recognition
                .as_ref()
                .and_then(|r| r.frame_skip)
                .unwrap_or(DEFAULT_FRAME_SKIP),
        };
        let cooldowns = CooldownSettings {
            greeting: Duration::from_secs(
                file.cooldowns
                    .as_ref()
                    .and_then(|c| c.greeting_secs)
                    .unwrap_or(DEFAULT_GREETING_COOLDOWN_SECS),
            ),
            report: Duration::from_secs(
                file.cooldowns
                    .as_ref()
                    .and_then(|c| c.report_secs)
                    .unwrap_or(DEFAULT_REPORT_COOLDOWN_SECS),
            ),
        };
        let model = ModelSettings {
            path: file
                .model
                .as_ref()
                .and_then(|m| m.path.clone())
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
            poll_interval: Duration::from_secs(
                file.model
                    .as_ref()
                    .and_then(|m| m.poll_secs)
                    .unwrap_or(DEFAULT_MODEL_POLL_SECS),
            ),
        };
        let access_log = AccessLogSettings {
            base_url: file
                .access_log
                .as_ref()
                .and_then(|a| a.base_url.clone())
                .unwrap_or_else(|| DEFAULT_ACCESS_LOG_URL.to_string()),
            timeout: Duration::from_secs(
                file.access_log
                    .as_ref()
                    .and_then(|a| a.timeout_secs)
                    .unwrap_or(DEFAULT_ACCESS_LOG_TIMEOUT_SECS),
            ),
            camera_location: file
                .access_log
                .as_ref()
                .and_then(|a| a.camera_location.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_LOCATION.to_string()),
            attach_snapshot: file
                .access_log
                .as_ref()
                .and_then(|a| a.attach_snapshot)
                .unwrap_or(false),
        };
        let directory = DirectorySettings {
            base_url: file
                .directory
                .as_ref()
                .and_then(|d| d.base_url.clone())
                .unwrap_or_else(|| DEFAULT_DIRECTORY_URL.to_string()),
            timeout: Duration::from_secs(
                file.directory
                    .as_ref()
                    .and_then(|d| d.timeout_secs)
                    .unwrap_or(DEFAULT_DIRECTORY_TIMEOUT_SECS),
            ),
            thumbnail_max: file
                .directory
                .as_ref()
                .and_then(|d| d.thumbnail_max)
                .unwrap_or(DEFAULT_THUMBNAIL_MAX),
        };
        Self {
            camera,
            queue_capacity: file.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            downscale: file.downscale.unwrap_or(DEFAULT_DOWNSCALE),
            recognition,
            cooldowns,
            model,
            access_log,
            directory,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("SENTRY_CAMERA_SOURCE") {
            if !source.trim().is_empty() {
                self.camera.source = source;
            }
        }
        if let Ok(path) = std::env::var("SENTRY_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = path;
            }
        }
        if let Ok(url) = std::env::var("SENTRY_ACCESS_LOG_URL") {
            if !url.trim().is_empty() {
                self.access_log.base_url = url;
            }
        }
        if let Ok(location) = std::env::var("SENTRY_CAMERA_LOCATION") {
            if !location.trim().is_empty() {
                self.access_log.camera_location = location;
            }
        }
        if let Ok(capacity) = std::env::var("SENTRY_QUEUE_CAPACITY") {
            let parsed: usize = capacity
                .parse()
                .map_err(|_| anyhow!("SENTRY_QUEUE_CAPACITY must be an integer"))?;
            self.queue_capacity = parsed;
        }
        if let Ok(cooldown) = std::env::var("SENTRY_REPORT_COOLDOWN_SECS") {
            let seconds: u64 = cooldown
                .parse()
                .map_err(|_| anyhow!("SENTRY_REPORT_COOLDOWN_SECS must be an integer number of seconds"))?;
            self.cooldowns.report = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(anyhow!("queue_capacity must be greater than zero"));
        }
        if !(self.downscale > 0.0 && self.downscale <= 1.0) {
            return Err(anyhow!("downscale must be in (0, 1]"));
        }
        if self.recognition.frame_skip == 0 {
            return Err(anyhow!("recognition.frame_skip must be at least 1"));
        }
        if !(self.recognition.tolerance > 0.0) {
            return Err(anyhow!("recognition.tolerance must be positive"));
        }
        if !(0.0..=1.0).contains(&self.recognition.min_confidence) {
            return Err(anyhow!("recognition.min_confidence must be in [0, 1]"));
        }
        if self.access_log.timeout.as_secs() == 0 {
            return Err(anyhow!("access_log.timeout_secs must be greater than zero"));
        }
        if self.model.poll_interval.as_secs() == 0 {
            return Err(anyhow!("model.poll_secs must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
