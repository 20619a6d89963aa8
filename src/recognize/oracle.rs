use anyhow::Result;

use crate::model::Encoding;
use crate::recognize::result::FaceObservation;

/// The external face-biometrics capability.
///
/// Implementations detect faces and extract encodings from raw RGB pixels,
/// and compare encodings by distance. The pipeline treats both as opaque,
/// already-correct operations; it never inspects encoding contents.
///
/// `detect` takes `&mut self` because real backends keep warm model state.
pub trait FaceOracle: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Detect faces in a frame and extract one encoding per face.
    ///
    /// Zero detected faces is an empty vec, not an error. Errors mean the
    /// extraction itself failed; the caller skips recognition for that
    /// frame and continues.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<FaceObservation>>;

    /// Distance between two encodings. Smaller is more similar.
    fn distance(&self, known: &Encoding, probe: &Encoding) -> f32 {
        euclidean_distance(known, probe)
    }
}

/// Euclidean distance over the shared prefix of two encodings.
pub fn euclidean_distance(a: &Encoding, b: &Encoding) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
