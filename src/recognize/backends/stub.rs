//! Deterministic stub oracle for tests and demos.
//!
//! By default the stub sees no faces. Tests can script it to emit a fixed
//! observation on every frame, or a per-frame sequence of observations,
//! which is enough to drive the whole pipeline without biometric code.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

use crate::model::{Encoding, ENCODING_LEN};
use crate::recognize::oracle::FaceOracle;
use crate::recognize::result::{BoundingBox, FaceObservation};

enum StubMode {
    /// No faces, ever. The default.
    Empty,
    /// The same single face on every frame.
    Constant(FaceObservation),
    /// One scripted observation list per frame; exhausted script means no
    /// faces. A `None` entry simulates an extraction failure.
    Script(VecDeque<Option<Vec<FaceObservation>>>),
}

pub struct StubOracle {
    mode: StubMode,
}

impl StubOracle {
    pub fn new() -> Self {
        Self {
            mode: StubMode::Empty,
        }
    }

    /// Emit the same face observation on every frame.
    pub fn with_constant_face(encoding: Encoding) -> Self {
        Self {
            mode: StubMode::Constant(FaceObservation {
                bounding_box: BoundingBox {
                    x: 0.25,
                    y: 0.25,
                    w: 0.5,
                    h: 0.5,
                },
                encoding,
            }),
        }
    }

    /// Play back one scripted observation list per detect call.
    pub fn with_script(script: Vec<Option<Vec<FaceObservation>>>) -> Self {
        Self {
            mode: StubMode::Script(script.into()),
        }
    }

    /// Derive a deterministic encoding from a byte seed. Distinct seeds give
    /// well-separated vectors, which is all the match tests need.
    pub fn encode_seed(seed: &[u8]) -> Encoding {
        let mut encoding = Vec::with_capacity(ENCODING_LEN);
        let mut hasher = Sha256::new();
        hasher.update(seed);
        let mut block: [u8; 32] = hasher.finalize().into();
        while encoding.len() < ENCODING_LEN {
            for byte in block {
                if encoding.len() == ENCODING_LEN {
                    break;
                }
                encoding.push(byte as f32 / 255.0);
            }
            block = Sha256::digest(block).into();
        }
        encoding
    }
}

impl Default for StubOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceOracle for StubOracle {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
    ) -> Result<Vec<FaceObservation>> {
        match &mut self.mode {
            StubMode::Empty => Ok(vec![]),
            StubMode::Constant(observation) => Ok(vec![observation.clone()]),
            StubMode::Script(script) => match script.pop_front() {
                Some(Some(observations)) => Ok(observations),
                Some(None) => Err(anyhow!("scripted extraction failure")),
                None => Ok(vec![]),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stub_sees_no_faces() {
        let mut oracle = StubOracle::new();
        assert!(oracle.detect(&[0u8; 12], 2, 2).unwrap().is_empty());
    }

    #[test]
    fn constant_face_repeats_every_frame() {
        let encoding = StubOracle::encode_seed(b"ada");
        let mut oracle = StubOracle::with_constant_face(encoding.clone());
        for _ in 0..3 {
            let faces = oracle.detect(&[0u8; 12], 2, 2).unwrap();
            assert_eq!(faces.len(), 1);
            assert_eq!(faces[0].encoding, encoding);
        }
    }

    #[test]
    fn script_plays_back_then_goes_quiet() {
        let obs = FaceObservation {
            bounding_box: BoundingBox::default(),
            encoding: StubOracle::encode_seed(b"x"),
        };
        let mut oracle = StubOracle::with_script(vec![Some(vec![obs]), None, Some(vec![])]);
        assert_eq!(oracle.detect(&[], 0, 0).unwrap().len(), 1);
        assert!(oracle.detect(&[], 0, 0).is_err());
        assert!(oracle.detect(&[], 0, 0).unwrap().is_empty());
        assert!(oracle.detect(&[], 0, 0).unwrap().is_empty());
    }

    #[test]
    fn encode_seed_is_deterministic_and_fixed_length() {
        let a = StubOracle::encode_seed(b"ada");
        let b = StubOracle::encode_seed(b"ada");
        let c = StubOracle::encode_seed(b"grace");
        assert_eq!(a.len(), ENCODING_LEN);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
