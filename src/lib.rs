//! gate-sentry
//!
//! Real-time face recognition pipeline for access control.
//!
//! # Architecture
//!
//! Two single-purpose loops connected by one bounded queue:
//!
//! ```text
//! FrameSource -> FrameQueue -> PipelineSupervisor -> MatchEngine
//!                                    |                    |
//!                                    v                    v
//!                             FingerprintStore     ThrottleController
//!                              (hot reload)               |
//!                                                         v
//!                                                   AccessReporter
//! ```
//!
//! The acquisition loop captures, downscales, and enqueues frames with
//! backpressure; the consume loop matches faces against the fingerprint
//! store, gates greetings and access-log reports through per-identity
//! cooldowns, and hot-reloads the store when the model artifact changes.
//! Frames are processed in capture order and never retried once skipped.
//!
//! # Module Structure
//!
//! - `frame`: frames and the bounded hand-off queue
//! - `ingest`: camera backends and the acquisition producer
//! - `model`: fingerprint store with atomic swap-on-reload
//! - `recognize`: the biometric oracle seam and the match policy
//! - `throttle`: per-identity greeting/report cooldown gates
//! - `transport`: best-effort Access-Log Service client
//! - `pipeline`: the supervisor owning the consume loop and lifecycle
//! - `directory` / `trainer`: training cycle (directory fetch -> artifact)
//! - `config`: file + environment configuration for the daemon

pub mod config;
pub mod directory;
pub mod frame;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod recognize;
pub mod throttle;
pub mod trainer;
pub mod transport;

pub use config::SentryConfig;
pub use directory::{DirectoryClient, IdentityProfile};
pub use frame::{Frame, FrameQueue, DEFAULT_QUEUE_CAPACITY};
pub use ingest::{CameraConfig, CameraSource, FrameSource, SourceStatus};
pub use model::{Encoding, FingerprintStore, IdentityRecord, ModelArtifact, ModelSnapshot};
pub use pipeline::{PipelineConfig, PipelineState, PipelineStats, PipelineSupervisor};
pub use recognize::{
    BoundingBox, FaceObservation, FaceOracle, MatchConfig, MatchEngine, MatchResult,
    MatchedIdentity, StubOracle,
};
pub use throttle::{Decision, ThrottleConfig, ThrottleController};
pub use trainer::{save_artifact, train_from_profiles, TrainingReport};
pub use transport::{AccessEvent, AccessReporter, RecordingSink, ReportSink};
