//! Nearest-neighbor match policy.
//!
//! A probe encoding is scanned against every (identity, encoding) pair in
//! the snapshot. The globally nearest encoding wins regardless of which
//! identity owns it; a first-found minimum would be wrong when identities
//! share nearby references, so the scan is always complete. The scan is
//! O(total reference encodings) per face, which is the intended trade at
//! small identity-set scale.

use anyhow::Result;

use crate::frame::Frame;
use crate::model::{Encoding, ModelSnapshot};
use crate::recognize::oracle::FaceOracle;
use crate::recognize::result::{MatchResult, MatchedIdentity};

/// Acceptance thresholds for a candidate match.
#[derive(Clone, Copy, Debug)]
pub struct MatchConfig {
    /// Maximum acceptable distance; smaller is stricter.
    pub tolerance: f32,
    /// Minimum derived confidence (1 - distance).
    pub min_confidence: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.6,
            min_confidence: 0.5,
        }
    }
}

pub struct MatchEngine {
    config: MatchConfig,
}

impl MatchEngine {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> MatchConfig {
        self.config
    }

    /// Detect all faces in a frame and match each against the snapshot.
    ///
    /// Zero detected faces yields an empty vec. An extraction error is
    /// propagated; the caller treats it as a per-frame degradation.
    pub fn recognize(
        &self,
        oracle: &mut dyn FaceOracle,
        frame: &Frame,
        snapshot: &ModelSnapshot,
    ) -> Result<Vec<MatchResult>> {
        let observations = oracle.detect(&frame.pixels, frame.width, frame.height)?;
        Ok(observations
            .into_iter()
            .map(|obs| {
                let (identity, confidence) =
                    self.match_encoding(oracle, &obs.encoding, snapshot);
                MatchResult {
                    identity,
                    confidence,
                    bounding_box: obs.bounding_box,
                }
            })
            .collect())
    }

    /// Match one probe encoding. Full scan; the globally nearest reference
    /// decides the candidate identity, then both thresholds must hold.
    pub fn match_encoding(
        &self,
        oracle: &dyn FaceOracle,
        probe: &Encoding,
        snapshot: &ModelSnapshot,
    ) -> (Option<MatchedIdentity>, f32) {
        let mut best: Option<(&crate::model::IdentityRecord, f32)> = None;
        for (record, reference) in snapshot.pairs() {
            let distance = oracle.distance(reference, probe);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((record, distance)),
            }
        }

        let Some((record, distance)) = best else {
            return (None, 0.0);
        };
        let confidence = (1.0 - distance).clamp(0.0, 1.0);
        if distance <= self.config.tolerance && confidence >= self.config.min_confidence {
            (
                Some(MatchedIdentity {
                    id: record.id,
                    display_name: record.display_name.clone(),
                }),
                confidence,
            )
        } else {
            (None, 0.0)
        }
    }
}
