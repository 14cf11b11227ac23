//! External collaborator traits.
//!
//! The engine and the bundled assistant steps never talk to a model or
//! validation service directly; they go through these trait objects. Real
//! backends live outside this crate. Tests plug in scripted fakes (see
//! `tests/common/`).

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;

/// Failure reported by an external collaborator.
///
/// Collaborator failures are run-fatal: the engine aborts the current run
/// without merging or checkpointing, so a retried run re-enters at the last
/// persisted position.
#[derive(Debug, Error, Diagnostic)]
pub enum CollaboratorError {
    #[error("collaborator '{name}' failed: {message}")]
    #[diagnostic(
        code(stateloom::collaborator::call_failed),
        help("the failed run left no partial state; retry the run to re-enter at the last checkpoint")
    )]
    CallFailed { name: String, message: String },
}

impl CollaboratorError {
    #[must_use]
    pub fn call_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallFailed {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Produces the next assistant message for a conversation.
///
/// The returned message may carry tool calls, which routes the session into
/// the dispatch step.
#[async_trait]
pub trait DecisionModel: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<Message, CollaboratorError>;
}

/// Extracts structured facets from a user query, judging its answerability.
#[async_trait]
pub trait QueryValidator: Send + Sync {
    async fn invoke(&self, message: &Message) -> Result<QueryFacets, CollaboratorError>;
}

/// Facets extracted from a user query by a [`QueryValidator`].
///
/// A facet the validator could not determine carries the [`INVALID`]
/// sentinel; a query is answerable only when both facets are determined.
///
/// [`INVALID`]: QueryFacets::INVALID
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFacets {
    pub location: String,
    pub topic: String,
}

impl QueryFacets {
    /// Sentinel for a facet the validator could not determine.
    pub const INVALID: &'static str = "INVALID";

    #[must_use]
    pub fn new(location: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            topic: topic.into(),
        }
    }

    /// Both facets undetermined.
    #[must_use]
    pub fn invalid() -> Self {
        Self::new(Self::INVALID, Self::INVALID)
    }

    /// True only when both facets were determined.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.location != Self::INVALID && self.topic != Self::INVALID
    }
}
