//! Access-Log Service client.
//!
//! Fire-and-forget: one synchronous POST with a short timeout, success iff
//! the service answers 201. Failures (timeout, non-201, transport error)
//! are logged and discarded; the pipeline never queues failed reports for
//! retry, because an access event loses its value within minutes.

use base64::Engine as _;
use serde::Serialize;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::frame::Frame;

/// One recognized-identity event to deliver.
#[derive(Clone, Debug)]
pub struct AccessEvent {
    pub customer_id: u64,
    pub confidence: f32,
    pub camera_location: String,
    /// JPEG-encoded snapshot, when the pipeline is configured to attach one.
    pub snapshot_jpeg: Option<Vec<u8>>,
}

/// Where the supervisor dispatches authorized reports.
///
/// Returns true on confirmed delivery. Implementations must not block
/// beyond their configured timeout and must not retry.
pub trait ReportSink: Send {
    fn report(&mut self, event: &AccessEvent) -> bool;
}

#[derive(Serialize)]
struct AccessLogPayload<'a> {
    customer_id: u64,
    confidence_score: f32,
    camera_location: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_base64: Option<String>,
}

/// HTTP client for the Access-Log Service.
pub struct AccessReporter {
    agent: ureq::Agent,
    url: String,
}

impl AccessReporter {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let url = format!("{}/access-logs/", base_url.trim_end_matches('/'));
        Self { agent, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReportSink for AccessReporter {
    fn report(&mut self, event: &AccessEvent) -> bool {
        let payload = AccessLogPayload {
            customer_id: event.customer_id,
            confidence_score: event.confidence,
            camera_location: &event.camera_location,
            snapshot_base64: event
                .snapshot_jpeg
                .as_deref()
                .map(|jpeg| base64::engine::general_purpose::STANDARD.encode(jpeg)),
        };

        match self.agent.post(&self.url).send_json(&payload) {
            Ok(response) if response.status() == 201 => {
                log::info!("access log created for customer {}", event.customer_id);
                true
            }
            Ok(response) => {
                log::warn!(
                    "access log rejected for customer {}: status {}",
                    event.customer_id,
                    response.status()
                );
                false
            }
            Err(ureq::Error::Status(code, _)) => {
                log::warn!(
                    "access log rejected for customer {}: status {}",
                    event.customer_id,
                    code
                );
                false
            }
            Err(e) => {
                log::warn!(
                    "access log dispatch failed for customer {}: {}",
                    event.customer_id,
                    e
                );
                false
            }
        }
    }
}

/// Encode a frame as JPEG for the optional report snapshot.
pub fn encode_snapshot_jpeg(frame: &Frame) -> Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .context("frame pixel buffer does not match its dimensions")?;
    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 80);
    img.write_with_encoder(encoder)
        .context("encode snapshot jpeg")?;
    Ok(jpeg)
}

/// Test sink that records every event instead of performing HTTP.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AccessEvent>,
    /// When false, every report is reported as failed delivery.
    pub deliver: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            deliver: true,
        }
    }
}

impl ReportSink for RecordingSink {
    fn report(&mut self, event: &AccessEvent) -> bool {
        self.events.push(event.clone());
        self.deliver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_builds_trailing_slash_url() {
        let reporter = AccessReporter::new("http://127.0.0.1:8000/", Duration::from_secs(5));
        assert_eq!(reporter.url(), "http://127.0.0.1:8000/access-logs/");
    }

    #[test]
    fn payload_omits_absent_snapshot() {
        let payload = AccessLogPayload {
            customer_id: 4,
            confidence_score: 0.91,
            camera_location: "Main Entrance Camera 1",
            snapshot_base64: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("snapshot_base64").is_none());
        assert_eq!(json["customer_id"], 4);
    }

    #[test]
    fn payload_carries_base64_snapshot() {
        let payload = AccessLogPayload {
            customer_id: 4,
            confidence_score: 0.91,
            camera_location: "Main Entrance Camera 1",
            snapshot_base64: Some(
                base64::engine::general_purpose::STANDARD.encode(b"\xff\xd8jpeg"),
            ),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["snapshot_base64"].is_string());
    }

    #[test]
    fn snapshot_encoding_produces_jpeg_magic() {
        let frame = Frame::new(vec![200u8; 8 * 8 * 3], 8, 8, 1);
        let jpeg = encode_snapshot_jpeg(&frame).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn recording_sink_captures_events() {
        let mut sink = RecordingSink::new();
        let ok = sink.report(&AccessEvent {
            customer_id: 9,
            confidence: 0.8,
            camera_location: "test".into(),
            snapshot_jpeg: None,
        });
        assert!(ok);
        assert_eq!(sink.events.len(), 1);
        assert_eq!(sink.events[0].customer_id, 9);
    }
}
