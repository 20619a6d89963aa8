//! Training cycle: identity profiles -> model artifact.
//!
//! For every reference image of every identity, run the oracle and keep the
//! first detected face's encoding. Images with no detectable face are
//! skipped and counted. The artifact is the parallel-array layout the
//! fingerprint store loads; an identity whose images all failed simply
//! contributes no entries and remains unmatchable until retrained.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::directory::IdentityProfile;
use crate::model::ModelArtifact;
use crate::recognize::FaceOracle;

/// Extraction accounting for one training run.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrainingReport {
    pub successful_encodings: usize,
    pub total_images: usize,
    pub identities: usize,
}

/// Build a model artifact from downloaded identity profiles.
pub fn train_from_profiles(
    profiles: &[IdentityProfile],
    oracle: &mut dyn FaceOracle,
) -> Result<(ModelArtifact, TrainingReport)> {
    let mut artifact = ModelArtifact {
        encodings: Vec::new(),
        names: Vec::new(),
        ids: Vec::new(),
    };
    let mut report = TrainingReport {
        identities: profiles.len(),
        ..TrainingReport::default()
    };

    for profile in profiles {
        for img in &profile.images {
            report.total_images += 1;
            let (width, height) = img.dimensions();
            let observations = match oracle.detect(img.as_raw(), width, height) {
                Ok(observations) => observations,
                Err(e) => {
                    log::warn!(
                        "encoding extraction failed for {} (id {}): {}",
                        profile.display_name,
                        profile.id,
                        e
                    );
                    continue;
                }
            };
            let Some(observation) = observations.into_iter().next() else {
                log::warn!(
                    "no face found in a reference image of {} (id {})",
                    profile.display_name,
                    profile.id
                );
                continue;
            };
            artifact.encodings.push(observation.encoding);
            artifact.names.push(profile.display_name.clone());
            artifact.ids.push(profile.id);
            report.successful_encodings += 1;
        }
    }

    log::info!(
        "training complete: {}/{} images encoded across {} identities",
        report.successful_encodings,
        report.total_images,
        report.identities
    );
    Ok((artifact, report))
}

/// Write the artifact to disk. Refuses to write an empty model so a bad
/// training run cannot clobber a working artifact.
pub fn save_artifact(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if artifact.encodings.is_empty() {
        return Err(anyhow!("no encodings to save; model not written"));
    }
    let json = serde_json::to_string(artifact).context("serialize model artifact")?;
    std::fs::write(path, json)
        .with_context(|| format!("write model artifact {}", path.display()))?;
    log::info!(
        "model saved to {} ({} encodings)",
        path.display(),
        artifact.encodings.len()
    );
    Ok(())
}
