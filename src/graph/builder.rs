//! Fluent, declarative construction of workflow graphs.

use std::collections::HashSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::step::Step;

use super::StepId;
use super::compile::{Graph, GraphDefinitionError};
use super::edges::{ConditionalEdge, Edge, Router};

/// Builder for a workflow [`Graph`].
///
/// Collects steps, edges, the entry point, and suspension marks, then
/// validates everything in [`compile`](Self::compile). Later registrations
/// replace earlier ones for the same step id, so a graph can be assembled in
/// layers.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use stateloom::graph::{GraphBuilder, StepId};
/// use stateloom::state::{SessionState, StatePatch};
/// use stateloom::step::{Step, StepContext, StepError};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Step for Noop {
///     async fn run(
///         &self,
///         _state: &SessionState,
///         _ctx: StepContext,
///     ) -> Result<StatePatch, StepError> {
///         Ok(StatePatch::new())
///     }
/// }
///
/// let graph = GraphBuilder::new()
///     .add_step("work", Noop)
///     .set_entry_point("work")
///     .add_edge("work", StepId::End)
///     .compile()
///     .unwrap();
/// assert_eq!(graph.entry_point(), &StepId::from("work"));
/// ```
#[derive(Default)]
pub struct GraphBuilder {
    pub(super) steps: FxHashMap<StepId, Arc<dyn Step>>,
    pub(super) edges: FxHashMap<StepId, Edge>,
    pub(super) entry_point: Option<StepId>,
    pub(super) suspension_steps: HashSet<StepId>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a runnable step under `id`.
    ///
    /// The virtual `End` terminal cannot be registered; attempting to is
    /// ignored with a warning.
    #[must_use]
    pub fn add_step(mut self, id: impl Into<StepId>, step: impl Step + 'static) -> Self {
        let id = id.into();
        if id.is_end() {
            warn!("attempted to register the virtual End terminal as a step; ignoring");
            return self;
        }
        self.steps.insert(id, Arc::new(step));
        self
    }

    /// Registers a step already behind an `Arc`, allowing one implementation
    /// to serve several graph positions.
    #[must_use]
    pub fn add_shared_step(mut self, id: impl Into<StepId>, step: Arc<dyn Step>) -> Self {
        let id = id.into();
        if id.is_end() {
            warn!("attempted to register the virtual End terminal as a step; ignoring");
            return self;
        }
        self.steps.insert(id, step);
        self
    }

    /// Adds a static edge: `from` unconditionally proceeds to `to`.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<StepId>, to: impl Into<StepId>) -> Self {
        self.edges.insert(from.into(), Edge::Static(to.into()));
        self
    }

    /// Adds a conditional edge: `from` proceeds to the target the router's
    /// value maps to.
    #[must_use]
    pub fn add_conditional_edge(
        mut self,
        from: impl Into<StepId>,
        router: Router,
        mapping: impl IntoIterator<Item = (impl Into<String>, impl Into<StepId>)>,
    ) -> Self {
        let mapping = mapping
            .into_iter()
            .map(|(value, target)| (value.into(), target.into()))
            .collect();
        self.edges
            .insert(from.into(), Edge::Conditional(ConditionalEdge::new(router, mapping)));
        self
    }

    /// Designates the step every fresh run starts at.
    #[must_use]
    pub fn set_entry_point(mut self, id: impl Into<StepId>) -> Self {
        self.entry_point = Some(id.into());
        self
    }

    /// Marks a step as a suspension point: after it runs and its output is
    /// merged, the engine checkpoints and returns control to the caller.
    #[must_use]
    pub fn mark_suspension(mut self, id: impl Into<StepId>) -> Self {
        self.suspension_steps.insert(id.into());
        self
    }

    /// Validates the accumulated definition and produces an executable
    /// [`Graph`]. See [`GraphDefinitionError`] for the checks performed.
    pub fn compile(self) -> Result<Graph, GraphDefinitionError> {
        Graph::from_builder(self)
    }
}
