//! The [`Step`] trait: the unit of work executed at each graph position.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::state::{SessionState, StatePatch};

/// Execution context handed to a step by the engine.
///
/// Carries run-scoped identifiers useful for logging and correlation; steps
/// must not use it to smuggle state between invocations.
#[derive(Clone, Debug)]
pub struct StepContext {
    /// Session this run belongs to.
    pub session_id: String,
    /// Zero-based position of this invocation within the current run.
    pub step_index: u64,
}

impl StepContext {
    #[must_use]
    pub fn new(session_id: impl Into<String>, step_index: u64) -> Self {
        Self {
            session_id: session_id.into(),
            step_index,
        }
    }
}

/// Errors surfaced by a step implementation.
///
/// A step failure aborts the run without merging the step's output and
/// without advancing the checkpoint; the engine wraps this in
/// `EngineError::Step` with the failing step's id attached.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// The state did not contain something the step requires.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(stateloom::step::missing_input),
        help("check the steps upstream of this one produce the field it reads")
    )]
    MissingInput { what: String },

    /// An external collaborator (model, validator) failed.
    #[error("collaborator call failed")]
    #[diagnostic(code(stateloom::step::collaborator))]
    Collaborator(
        #[from]
        #[diagnostic_source]
        CollaboratorError,
    ),
}

/// A named unit of work in a workflow graph.
///
/// Implementations read the session state and return a [`StatePatch`]; they
/// never mutate state directly, so the engine stays the single owner of merge
/// policy. Steps must be deterministic given their inputs up to collaborator
/// behavior, and must tolerate re-execution with equivalent state (resume
/// replays routing, not steps, but collaborators may be retried after a
/// failed run).
///
/// ```
/// use async_trait::async_trait;
/// use stateloom::state::{Patch, SessionState, StatePatch};
/// use stateloom::step::{Step, StepContext, StepError};
///
/// struct MarkValid;
///
/// #[async_trait]
/// impl Step for MarkValid {
///     async fn run(
///         &self,
///         _state: &SessionState,
///         _ctx: StepContext,
///     ) -> Result<StatePatch, StepError> {
///         Ok(StatePatch::new().with_is_valid(Patch::Set(true)))
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync {
    /// Executes the step against a read-only view of the session state.
    async fn run(&self, state: &SessionState, ctx: StepContext)
    -> Result<StatePatch, StepError>;
}
