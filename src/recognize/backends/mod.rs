//! Oracle backends.
//!
//! Only the deterministic stub ships with the crate; production deployments
//! plug a real biometric backend in through the `FaceOracle` trait.

pub mod stub;

pub use stub::StubOracle;
