//! The execution engine: session-scoped, checkpoint-aware graph runs.

pub mod runner;
pub mod session;

pub use runner::{DEFAULT_MAX_STEPS, Engine, EngineError};
pub use session::{RunOutcome, RunStatus, new_session_id};
