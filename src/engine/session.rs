//! Session identifiers and run outcomes.

use uuid::Uuid;

use crate::graph::StepId;
use crate::state::SessionState;

/// Generates a fresh session id.
///
/// Convenience for callers that do not bring their own id scheme; any
/// unique string works as a session id.
#[must_use]
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The graph reached the terminal; the session's checkpoint was removed.
    Completed,
    /// Execution paused after the named suspension step; a checkpoint was
    /// written and the session resumes on the next `run` call.
    Suspended { at: StepId },
}

/// Result of a successful engine run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// The session state as of the pause or completion.
    pub state: SessionState,
    pub status: RunStatus,
}

impl RunOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self.status, RunStatus::Suspended { .. })
    }
}
