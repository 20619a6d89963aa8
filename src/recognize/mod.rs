//! Face detection and matching.
//!
//! The biometric math lives behind the `FaceOracle` trait; this crate treats
//! extraction and comparison as an already-correct external capability and
//! only implements the nearest-neighbor match policy on top of it.

pub mod backends;
pub mod engine;
pub mod oracle;
pub mod result;

pub use backends::StubOracle;
pub use engine::{MatchConfig, MatchEngine};
pub use oracle::{euclidean_distance, FaceOracle};
pub use result::{BoundingBox, FaceObservation, MatchResult, MatchedIdentity};
