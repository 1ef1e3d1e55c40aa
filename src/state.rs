//! Shared grading state.
//!
//! Components read it through selectors and change it only through the action
//! methods on [`SharedState`].

use crate::model::{ExportRequest, FileDescriptor, SubmissionResponse};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const DEFAULT_FEEDBACK_PROMPT: &str = "Add comments about this submission";

#[derive(Debug, Clone)]
pub struct GradingState {
    pub response: SubmissionResponse,
    pub username: String,
    pub overall_feedback: String,
    pub is_grading: bool,
    pub feedback_prompt: String,
}

impl Default for GradingState {
    fn default() -> Self {
        Self {
            response: SubmissionResponse::default(),
            username: String::new(),
            overall_feedback: String::new(),
            is_grading: false,
            feedback_prompt: DEFAULT_FEEDBACK_PROMPT.to_string(),
        }
    }
}

/// Read-only view of the export inputs.
pub trait ExportSource: Send + Sync {
    fn current_files(&self) -> Vec<FileDescriptor>;
    fn current_username(&self) -> String;

    /// Snapshot both inputs at once.
    fn export_request(&self) -> ExportRequest {
        ExportRequest {
            files: self.current_files(),
            username: self.current_username(),
        }
    }
}

/// Cloneable handle to the process-wide grading state.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<GradingState>>,
}

impl SharedState {
    // Poisoning is ignored; the state is plain data.
    fn read(&self) -> RwLockReadGuard<'_, GradingState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GradingState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> GradingState {
        self.read().clone()
    }

    pub fn overall_feedback(&self) -> String {
        self.read().overall_feedback.clone()
    }

    pub fn feedback_prompt(&self) -> String {
        self.read().feedback_prompt.clone()
    }

    pub fn is_grading(&self) -> bool {
        self.read().is_grading
    }

    /// Replace the selected submission. Clears any feedback typed for the previous one.
    pub fn load_submission(&self, response: SubmissionResponse, username: impl Into<String>) {
        let mut state = self.write();
        state.response = response;
        state.username = username.into();
        state.overall_feedback.clear();
        state.is_grading = false;
    }

    pub fn start_grading(&self) {
        self.write().is_grading = true;
    }

    pub fn stop_grading(&self) {
        self.write().is_grading = false;
    }

    pub fn set_overall_feedback(&self, value: impl Into<String>) {
        self.write().overall_feedback = value.into();
    }

    pub fn set_feedback_prompt(&self, prompt: impl Into<String>) {
        self.write().feedback_prompt = prompt.into();
    }
}

impl ExportSource for SharedState {
    fn current_files(&self) -> Vec<FileDescriptor> {
        self.read().response.files.clone()
    }

    fn current_username(&self) -> String {
        self.read().username.clone()
    }
}
