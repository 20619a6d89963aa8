//! Identity Directory client.
//!
//! Used during (re)training, never during live recognition. Fetches the
//! directory's identity list, downloads each reference image, and converts
//! it to a bounded thumbnail before fingerprint extraction. Individual image
//! failures are skipped with a warning; only the directory request itself is
//! fatal.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;

use image::RgbImage;

const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Wire format: `GET <base>/identities`.
#[derive(Debug, Deserialize)]
pub struct DirectoryIdentity {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// One identity with its downloaded, thumbnailed reference images.
pub struct IdentityProfile {
    pub id: u64,
    /// Display name with all whitespace stripped, matching the trainer's
    /// label convention.
    pub display_name: String,
    pub images: Vec<RgbImage>,
}

pub struct DirectoryClient {
    agent: ureq::Agent,
    base_url: String,
    thumbnail_max: u32,
}

impl DirectoryClient {
    pub fn new(base_url: &str, timeout: Duration, thumbnail_max: u32) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            thumbnail_max: thumbnail_max.max(1),
        }
    }

    /// Fetch every known identity and its reference images.
    pub fn fetch_identities(&self) -> Result<Vec<IdentityProfile>> {
        let url = format!("{}/identities", self.base_url);
        let response = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("fetch identities from {}", url))?;
        let body = response
            .into_string()
            .context("read identity directory response")?;
        let records = parse_identities(body.as_bytes())?;

        let mut profiles = Vec::with_capacity(records.len());
        for record in records {
            log::info!(
                "processing {} ({} reference images)",
                record.full_name,
                record.images.len()
            );
            let mut images = Vec::new();
            for image_url in &record.images {
                match self.download_image(image_url) {
                    Ok(img) => images.push(img),
                    Err(e) => {
                        log::warn!("skipping reference image {}: {}", image_url, e);
                    }
                }
            }
            profiles.push(IdentityProfile {
                id: record.id,
                display_name: strip_whitespace(&record.full_name),
                images,
            });
        }
        Ok(profiles)
    }

    /// Download one reference image and reduce it to a bounded thumbnail.
    fn download_image(&self, url: &str) -> Result<RgbImage> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("download {}", url))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .context("read image body")?;
        if bytes.is_empty() {
            return Err(anyhow!("empty image body"));
        }
        let decoded = image::load_from_memory(&bytes).context("decode image")?;
        Ok(decoded
            .thumbnail(self.thumbnail_max, self.thumbnail_max)
            .into_rgb8())
    }
}

/// Parse the identity directory payload.
pub fn parse_identities(payload: &[u8]) -> Result<Vec<DirectoryIdentity>> {
    serde_json::from_slice(payload).context("parse identity directory payload")
}

fn strip_whitespace(name: &str) -> String {
    name.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY_PAYLOAD: &str = r#"[
        {
            "id": 12,
            "full_name": "Ada Lovelace",
            "images": ["http://example/img/ada-1.jpg", "http://example/img/ada-2.jpg"]
        },
        {
            "id": 15,
            "full_name": "Grace Hopper",
            "images": []
        }
    ]"#;

    #[test]
    fn parses_directory_payload() {
        let records = parse_identities(DIRECTORY_PAYLOAD.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 12);
        assert_eq!(records[0].images.len(), 2);
        assert_eq!(records[1].full_name, "Grace Hopper");
        assert!(records[1].images.is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_identities(b"{\"oops\": 1}").is_err());
    }

    #[test]
    fn display_names_drop_all_whitespace() {
        assert_eq!(strip_whitespace("Ada Lovelace"), "AdaLovelace");
        assert_eq!(strip_whitespace("  Grace \t Hopper "), "GraceHopper");
    }
}
