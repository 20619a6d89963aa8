//! Fingerprint store.
//!
//! Holds the current set of (identity, encoding) pairs, loaded from a model
//! artifact written by the trainer. Reloads swap the snapshot atomically: a
//! reader always observes a fully-old or fully-new store, and a failed load
//! never degrades the store to empty.
//!
//! Artifact layout mirrors the trainer's output: parallel `encodings`,
//! `names`, and `ids` arrays of equal length, one entry per reference
//! encoding. Staleness is detected by comparing the artifact's modification
//! time against the last successfully loaded one.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A face feature vector produced by the external biometric oracle.
pub type Encoding = Vec<f32>;

/// Conventional encoding length. The store does not enforce it; the oracle
/// defines the actual dimensionality.
pub const ENCODING_LEN: usize = 128;

/// One known identity and its reference encodings.
///
/// An identity with an empty encodings list is unmatchable, not invalid.
#[derive(Clone, Debug)]
pub struct IdentityRecord {
    pub id: u64,
    pub display_name: String,
    pub encodings: Vec<Encoding>,
}

/// On-disk model artifact: parallel arrays, one entry per encoding.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub encodings: Vec<Encoding>,
    pub names: Vec<String>,
    pub ids: Vec<u64>,
}

/// Immutable, consistently-versioned view of all known identities.
#[derive(Debug, Default)]
pub struct ModelSnapshot {
    records: HashMap<u64, IdentityRecord>,
    total_encodings: usize,
}

impl ModelSnapshot {
    fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        if artifact.encodings.len() != artifact.names.len()
            || artifact.encodings.len() != artifact.ids.len()
        {
            return Err(anyhow!(
                "model artifact arrays disagree: {} encodings, {} names, {} ids",
                artifact.encodings.len(),
                artifact.names.len(),
                artifact.ids.len()
            ));
        }

        let total_encodings = artifact.encodings.len();
        let mut records: HashMap<u64, IdentityRecord> = HashMap::new();
        for ((encoding, name), id) in artifact
            .encodings
            .into_iter()
            .zip(artifact.names)
            .zip(artifact.ids)
        {
            records
                .entry(id)
                .or_insert_with(|| IdentityRecord {
                    id,
                    display_name: name,
                    encodings: Vec::new(),
                })
                .encodings
                .push(encoding);
        }

        Ok(Self {
            records,
            total_encodings,
        })
    }

    pub fn record(&self, id: u64) -> Option<&IdentityRecord> {
        self.records.get(&id)
    }

    pub fn identity_count(&self) -> usize {
        self.records.len()
    }

    pub fn encoding_count(&self) -> usize {
        self.total_encodings
    }

    pub fn is_empty(&self) -> bool {
        self.total_encodings == 0
    }

    /// Flattened (identity, encoding) pairs for the nearest-neighbor scan.
    pub fn pairs(&self) -> impl Iterator<Item = (&IdentityRecord, &Encoding)> {
        self.records
            .values()
            .flat_map(|record| record.encodings.iter().map(move |enc| (record, enc)))
    }
}

/// Hot-reloadable store of identity fingerprints.
pub struct FingerprintStore {
    path: PathBuf,
    snapshot: Arc<ModelSnapshot>,
    last_modified: Option<SystemTime>,
}

impl FingerprintStore {
    /// Create a store for the given artifact path. Starts empty; call
    /// `load()` to populate it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: Arc::new(ModelSnapshot::default()),
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the artifact and swap the snapshot atomically.
    ///
    /// On any failure (missing file, parse error, inconsistent arrays) the
    /// previous snapshot and its version stamp are retained.
    pub fn load(&mut self) -> Result<()> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read model artifact {}", self.path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("parse model artifact {}", self.path.display()))?;
        let snapshot = ModelSnapshot::from_artifact(artifact)?;

        let mtime = std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("stat model artifact {}", self.path.display()))?;

        self.snapshot = Arc::new(snapshot);
        self.last_modified = Some(mtime);
        log::info!(
            "model loaded: {} identities, {} encodings",
            self.snapshot.identity_count(),
            self.snapshot.encoding_count()
        );
        Ok(())
    }

    /// Current snapshot. Cheap to clone; the consume loop holds one per
    /// frame so a concurrent-looking reload can never show partial state.
    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Modification time of the last successfully loaded artifact.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Non-blocking staleness check: true when the artifact on disk is newer
    /// than the loaded snapshot. A missing artifact is not stale.
    pub fn is_stale(&self) -> bool {
        let Ok(meta) = std::fs::metadata(&self.path) else {
            return false;
        };
        let Ok(mtime) = meta.modified() else {
            return false;
        };
        match self.last_modified {
            Some(loaded) => mtime > loaded,
            None => true,
        }
    }
}
