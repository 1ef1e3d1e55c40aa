//! Overall feedback input bound to the grading state.

use crate::state::SharedState;

/// Text input for the grader's overall feedback.
///
/// Reads its value from state and writes changes back through the
/// `set_overall_feedback` action. Editing is disabled unless grading is active.
#[derive(Debug, Clone)]
pub struct FeedbackInput {
    state: SharedState,
}

impl FeedbackInput {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn value(&self) -> String {
        self.state.overall_feedback()
    }

    pub fn prompt(&self) -> String {
        self.state.feedback_prompt()
    }

    pub fn is_disabled(&self) -> bool {
        !self.state.is_grading()
    }

    /// Change handler. Returns false when the input is disabled and nothing changed.
    pub fn on_value_changed(&self, new_value: &str) -> bool {
        if self.is_disabled() {
            tracing::debug!("feedback change ignored: not grading");
            return false;
        }
        self.state.set_overall_feedback(new_value);
        true
    }
}
