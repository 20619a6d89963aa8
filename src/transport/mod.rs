//! Outbound clients.
//!
//! Currently one: the best-effort Access-Log Service client. The
//! `ReportSink` trait is the seam the supervisor dispatches through, so
//! tests can record events instead of performing HTTP.

pub mod access_log;

pub use access_log::{encode_snapshot_jpeg, AccessEvent, AccessReporter, RecordingSink, ReportSink};
