//! Stateful workflow execution engine.
//!
//! `stateloom` runs directed graphs of named steps over a typed, mergeable
//! session state. Graphs may contain cycles; conditional edges route on the
//! merged state; designated suspension steps checkpoint the session and hand
//! control back to the caller, who resumes it later (possibly in another
//! process) with new input.
//!
//! The pieces:
//!
//! - [`state`]: [`SessionState`](state::SessionState) and the per-field merge
//!   policies, applied only by the engine.
//! - [`graph`]: declarative [`GraphBuilder`](graph::GraphBuilder) with
//!   construction-time validation of every structural invariant.
//! - [`engine`]: the [`Engine`](engine::Engine), which loads or starts a
//!   session, interprets the graph sequentially, and checkpoints at
//!   suspension points.
//! - [`checkpoint`]: the [`Checkpointer`](checkpoint::Checkpointer) trait
//!   with in-memory and SQLite backends.
//! - [`tools`]: name-keyed registry with best-effort batch dispatch.
//! - [`assistant`]: a bundled feedback-loop assistant graph built on
//!   injected collaborator traits.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use stateloom::checkpoint::InMemoryCheckpointer;
//! use stateloom::engine::Engine;
//! use stateloom::graph::{GraphBuilder, StepId};
//! use stateloom::state::{Patch, SessionState, StatePatch};
//! use stateloom::step::{Step, StepContext, StepError};
//!
//! struct Answer;
//!
//! #[async_trait]
//! impl Step for Answer {
//!     async fn run(
//!         &self,
//!         _state: &SessionState,
//!         _ctx: StepContext,
//!     ) -> Result<StatePatch, StepError> {
//!         Ok(StatePatch::new().with_final_answer(Patch::Set("done".into())))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = GraphBuilder::new()
//!     .add_step("answer", Answer)
//!     .set_entry_point("answer")
//!     .add_edge("answer", StepId::End)
//!     .compile()?;
//!
//! let engine = Engine::new(graph, Arc::new(InMemoryCheckpointer::new()));
//! let outcome = engine.run("session-1", StatePatch::new()).await?;
//! assert!(outcome.is_completed());
//! assert_eq!(outcome.state.final_answer.as_deref(), Some("done"));
//! # Ok(())
//! # }
//! ```

pub mod assistant;
pub mod checkpoint;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod graph;
pub mod message;
pub mod state;
pub mod step;
pub mod telemetry;
pub mod tools;

pub use checkpoint::{Checkpoint, Checkpointer, CheckpointerError, Cursor, InMemoryCheckpointer};
pub use collaborators::{CollaboratorError, DecisionModel, QueryFacets, QueryValidator};
pub use config::{CheckpointerType, ConfigError, EngineConfig};
pub use engine::{DEFAULT_MAX_STEPS, Engine, EngineError, RunOutcome, RunStatus, new_session_id};
pub use graph::{Graph, GraphBuilder, GraphDefinitionError, Router, StepId};
pub use message::{Message, ToolCall, ToolResult};
pub use state::{MessagesPatch, Patch, SessionState, StatePatch};
pub use step::{Step, StepContext, StepError};
pub use tools::{DispatchOutcome, Tool, ToolError, ToolRegistry};
