//! Checkpoint persistence: the [`Checkpointer`] trait and its backends.
//!
//! A checkpoint is the durable record of a suspended session: its merged
//! state plus a cursor naming where execution resumes. The engine writes a
//! checkpoint only at suspension points and removes it at completion, so a
//! stored checkpoint always represents a session waiting for caller input.

pub mod persistence;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCheckpointer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::graph::StepId;
use crate::state::SessionState;

/// Resume position persisted with a checkpoint.
///
/// `At` points at a step that has not yet run. `RouteFrom` points at the
/// successor position of a step that has already run and merged; resuming
/// evaluates that step's outgoing edge against the merged state (including
/// any input supplied at resume time) to find the next step. Suspensions
/// persist `RouteFrom` so that resume input can steer the route without the
/// suspension step ever re-executing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cursor {
    /// Execution resumes by running this step.
    At(StepId),
    /// Execution resumes by routing out of this already-run step.
    RouteFrom(StepId),
}

impl Cursor {
    /// Stable string form for persistence.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Cursor::At(id) => format!("at:{}", id.encode()),
            Cursor::RouteFrom(id) => format!("route-from:{}", id.encode()),
        }
    }

    /// Parses the string form produced by [`encode`](Self::encode).
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix("at:") {
            Some(Cursor::At(StepId::decode(rest)))
        } else if let Some(rest) = raw.strip_prefix("route-from:") {
            Some(Cursor::RouteFrom(StepId::decode(rest)))
        } else {
            None
        }
    }
}

/// Durable record of a suspended session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub session_id: String,
    pub state: SessionState,
    pub cursor: Cursor,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(session_id: impl Into<String>, state: SessionState, cursor: Cursor) -> Self {
        Self {
            session_id: session_id.into(),
            state,
            cursor,
            updated_at: Utc::now(),
        }
    }
}

/// Failures raised by a checkpoint backend.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("failed to serialize checkpoint for session '{session_id}'")]
    #[diagnostic(code(stateloom::checkpoint::serialize))]
    Serialize {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored checkpoint for session '{session_id}' is corrupt: {detail}")]
    #[diagnostic(
        code(stateloom::checkpoint::corrupt),
        help("the stored row predates this schema or was modified out of band")
    )]
    Corrupt { session_id: String, detail: String },

    #[cfg(feature = "sqlite")]
    #[error("checkpoint database operation failed")]
    #[diagnostic(code(stateloom::checkpoint::database))]
    Database(#[from] sqlx::Error),
}

/// Storage backend for session checkpoints.
///
/// Backends are keyed by session id; `save` is an upsert and the trait makes
/// no retention promises beyond "last write wins".
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Inserts or replaces the checkpoint for its session.
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// Loads the checkpoint for a session, if one exists.
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointerError>;

    /// Removes a session's checkpoint. Removing a missing checkpoint is not
    /// an error.
    async fn clear(&self, session_id: &str) -> Result<(), CheckpointerError>;

    /// Ids of all sessions with a stored checkpoint.
    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointerError>;
}

/// Process-local checkpoint store for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    store: RwLock<FxHashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.store
            .write()
            .insert(checkpoint.session_id.clone(), checkpoint);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        Ok(self.store.read().get(session_id).cloned())
    }

    async fn clear(&self, session_id: &str) -> Result<(), CheckpointerError> {
        self.store.write().remove(session_id);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointerError> {
        Ok(self.store.read().keys().cloned().collect())
    }
}
