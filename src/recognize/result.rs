use crate::model::Encoding;

/// Face location within a frame (normalized 0..1 coordinates).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// One detected face: where it is and its extracted encoding.
#[derive(Clone, Debug)]
pub struct FaceObservation {
    pub bounding_box: BoundingBox,
    pub encoding: Encoding,
}

/// Identity accepted by the match policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedIdentity {
    pub id: u64,
    pub display_name: String,
}

/// Outcome of matching one detected face.
///
/// `identity == None` means "face seen but unrecognized" and carries
/// confidence 0. "No face detected" is an empty result sequence for the
/// frame, not a `MatchResult`.
#[derive(Clone, Debug)]
pub struct MatchResult {
    pub identity: Option<MatchedIdentity>,
    /// Derived confidence in [0, 1]; 1 - distance for accepted matches.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}
