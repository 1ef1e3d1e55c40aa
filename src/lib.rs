//! Export a graded submission's attachments as a single zip archive.
//!
//! The pipeline fetches every file of a submission response concurrently,
//! writes a `manifest.txt` plus each file into a zip and saves it locally.
//! Exports run as tracked requests so callers can observe their outcome.

pub mod cli;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod state;
pub mod storage;
#[cfg(test)]
mod test_server;
mod text_summary;
