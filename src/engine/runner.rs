//! The [`Engine`]: drives a compiled graph over checkpointed sessions.
//!
//! A run is a sequential interpretation loop with a single cursor. Each
//! iteration either executes the step under the cursor and merges its patch,
//! or resolves an edge to move the cursor. Checkpoints are written only at
//! suspension points and removed at completion, so the store never holds a
//! mid-flight position.

use std::sync::Arc;

use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::checkpoint::{Checkpoint, Checkpointer, CheckpointerError, Cursor};
use crate::config::{ConfigError, EngineConfig};
use crate::graph::{Edge, Graph, StepId};
use crate::state::{SessionState, StatePatch};
use crate::step::{StepContext, StepError};

use super::session::{RunOutcome, RunStatus};

/// Step-execution budget per run unless overridden.
pub const DEFAULT_MAX_STEPS: u64 = 1000;

/// Runtime failures surfaced by the engine.
///
/// Any of these abort the run with no state merged and no checkpoint
/// written, so the session's last persisted position is untouched and the
/// run can simply be retried.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("step '{step}' failed")]
    #[diagnostic(code(stateloom::engine::step_failed))]
    Step {
        step: String,
        #[source]
        #[diagnostic_source]
        source: StepError,
    },

    #[error("session '{session_id}' exceeded the {max_steps}-step budget")]
    #[diagnostic(
        code(stateloom::engine::infinite_loop),
        help("a cycle is not converging; raise the budget with with_max_steps or fix the routing")
    )]
    InfiniteLoop { session_id: String, max_steps: u64 },

    #[error("session '{session_id}' already has a run in progress")]
    #[diagnostic(
        code(stateloom::engine::session_busy),
        help("use run(..) to wait for the active run instead of try_run(..)")
    )]
    SessionBusy { session_id: String },

    #[error("router on '{step}' returned undeclared value '{value}'")]
    #[diagnostic(
        code(stateloom::engine::unmapped_router_value),
        help("the router's decide function returned a value outside its declared outputs")
    )]
    UnmappedRouterValue { step: String, value: String },

    #[error("checkpoint cursor names step '{step}' missing from this graph")]
    #[diagnostic(
        code(stateloom::engine::unknown_cursor_step),
        help("the checkpoint was written by a different graph topology")
    )]
    UnknownCursorStep { step: String },

    #[error("checkpoint store operation failed")]
    #[diagnostic(code(stateloom::engine::checkpoint))]
    Checkpoint(
        #[from]
        #[diagnostic_source]
        CheckpointerError,
    ),
}

/// Executes a compiled [`Graph`] over named, checkpointed sessions.
///
/// One engine serves many sessions concurrently; runs within a session are
/// serialized through a per-session lock.
pub struct Engine {
    graph: Arc<Graph>,
    checkpointer: Arc<dyn Checkpointer>,
    locks: Mutex<FxHashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    max_steps: u64,
}

impl Engine {
    #[must_use]
    pub fn new(graph: Graph, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            graph: Arc::new(graph),
            checkpointer,
            locks: Mutex::new(FxHashMap::default()),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Builds an engine with the checkpoint backend named by `config`.
    pub async fn from_config(graph: Graph, config: &EngineConfig) -> Result<Self, ConfigError> {
        let checkpointer = config.create_checkpointer().await?;
        Ok(Self::new(graph, checkpointer).with_max_steps(config.max_steps))
    }

    /// Overrides the per-run step budget.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The checkpoint backend this engine persists through.
    #[must_use]
    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Runs the session until it suspends or completes, waiting for any
    /// in-flight run on the same session to finish first.
    ///
    /// `input` is merged into the session state before execution: the seed
    /// patch for a fresh session, or the resume input (e.g. user feedback)
    /// for a suspended one.
    #[instrument(skip(self, input), fields(session_id = %session_id))]
    pub async fn run(
        &self,
        session_id: &str,
        input: StatePatch,
    ) -> Result<RunOutcome, EngineError> {
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.run_locked(session_id, input).await
        };
        self.release_session_lock(session_id, &lock);
        result
    }

    /// Like [`run`](Self::run) but fails fast with
    /// [`EngineError::SessionBusy`] instead of waiting.
    #[instrument(skip(self, input), fields(session_id = %session_id))]
    pub async fn try_run(
        &self,
        session_id: &str,
        input: StatePatch,
    ) -> Result<RunOutcome, EngineError> {
        let lock = self.session_lock(session_id);
        let result = {
            let Ok(_guard) = lock.try_lock() else {
                return Err(EngineError::SessionBusy {
                    session_id: session_id.to_string(),
                });
            };
            self.run_locked(session_id, input).await
        };
        self.release_session_lock(session_id, &lock);
        result
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    /// Drops the session's lock-table entry once no other caller holds it,
    /// keeping the table bounded by the number of active sessions.
    fn release_session_lock(&self, session_id: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        // Two owners are the table entry and our handle; anything more is a
        // waiter that still needs the entry.
        if Arc::strong_count(lock) == 2 {
            locks.remove(session_id);
        }
    }

    async fn run_locked(
        &self,
        session_id: &str,
        input: StatePatch,
    ) -> Result<RunOutcome, EngineError> {
        let (mut state, mut cursor) = match self.checkpointer.load(session_id).await? {
            Some(checkpoint) => {
                info!(cursor = %checkpoint.cursor.encode(), "resuming session from checkpoint");
                (checkpoint.state, checkpoint.cursor)
            }
            None => {
                info!(entry = %self.graph.entry_point(), "starting fresh session");
                (
                    SessionState::default(),
                    Cursor::At(self.graph.entry_point().clone()),
                )
            }
        };
        state.apply(input);

        let mut steps_run: u64 = 0;
        loop {
            match cursor {
                Cursor::At(StepId::End) => {
                    self.checkpointer.clear(session_id).await?;
                    info!(steps_run, "session completed");
                    return Ok(RunOutcome {
                        state,
                        status: RunStatus::Completed,
                    });
                }
                Cursor::At(step_id) => {
                    if steps_run >= self.max_steps {
                        warn!(max_steps = self.max_steps, "step budget exhausted");
                        return Err(EngineError::InfiniteLoop {
                            session_id: session_id.to_string(),
                            max_steps: self.max_steps,
                        });
                    }
                    let step = self.graph.step(&step_id).ok_or_else(|| {
                        EngineError::UnknownCursorStep {
                            step: step_id.to_string(),
                        }
                    })?;

                    let span = info_span!("step", step = %step_id, index = steps_run);
                    let ctx = StepContext::new(session_id, steps_run);
                    let patch = step
                        .run(&state, ctx)
                        .instrument(span)
                        .await
                        .map_err(|source| EngineError::Step {
                            step: step_id.to_string(),
                            source,
                        })?;
                    state.apply(patch);
                    steps_run += 1;

                    if self.graph.is_suspension(&step_id) {
                        let checkpoint = Checkpoint::new(
                            session_id,
                            state.clone(),
                            Cursor::RouteFrom(step_id.clone()),
                        );
                        self.checkpointer.save(checkpoint).await?;
                        info!(at = %step_id, "session suspended");
                        return Ok(RunOutcome {
                            state,
                            status: RunStatus::Suspended { at: step_id },
                        });
                    }
                    cursor = Cursor::RouteFrom(step_id);
                }
                Cursor::RouteFrom(step_id) => {
                    let target = self.route_from(&step_id, &state)?;
                    debug!(from = %step_id, to = %target, "routed");
                    cursor = Cursor::At(target);
                }
            }
        }
    }

    /// Resolves a step's outgoing edge against the current state.
    fn route_from(&self, from: &StepId, state: &SessionState) -> Result<StepId, EngineError> {
        let edge = self
            .graph
            .edge(from)
            .ok_or_else(|| EngineError::UnknownCursorStep {
                step: from.to_string(),
            })?;
        match edge {
            Edge::Static(target) => Ok(target.clone()),
            Edge::Conditional(cond) => {
                let value = cond.router().decide(state);
                cond.mapping().get(&value).cloned().ok_or_else(|| {
                    EngineError::UnmappedRouterValue {
                        step: from.to_string(),
                        value,
                    }
                })
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("graph", &self.graph)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}
