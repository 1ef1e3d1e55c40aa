//! Application-level orchestration.
//!
//! This module owns the tracked-request registry and the export orchestrator that
//! dispatches download-and-archive runs through it. The CLI calls into this module
//! and observes outcomes through request status and the event channel.

mod exporter;
mod tracker;

pub use exporter::Exporter;
pub use tracker::{RequestKey, RequestStatus, RequestTracker, TrackedRequest};
