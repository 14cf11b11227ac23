//! Graph compilation: structural validation and the executable [`Graph`].

use std::collections::HashSet;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::step::Step;

use super::StepId;
use super::builder::GraphBuilder;
use super::edges::Edge;

/// Structural problems detected when compiling a graph definition.
///
/// Every structural property the engine relies on at runtime is checked
/// here; a compiled [`Graph`] cannot route to an unregistered step or strand
/// a session without a path to the terminal.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum GraphDefinitionError {
    #[error("no entry point set")]
    #[diagnostic(
        code(stateloom::graph::missing_entry),
        help("call set_entry_point(..) before compile()")
    )]
    MissingEntryPoint,

    #[error("entry point '{0}' is not a registered step")]
    #[diagnostic(code(stateloom::graph::unknown_entry))]
    UnknownEntryPoint(String),

    #[error("step '{0}' has no outgoing edge")]
    #[diagnostic(
        code(stateloom::graph::missing_edge),
        help("every step needs exactly one outgoing edge, static or conditional")
    )]
    MissingEdge(String),

    #[error("edge from unregistered step '{0}'")]
    #[diagnostic(code(stateloom::graph::edge_from_unknown))]
    EdgeFromUnknownStep(String),

    #[error("edge from '{from}' targets unregistered step '{to}'")]
    #[diagnostic(code(stateloom::graph::unknown_target))]
    UnknownTarget { from: String, to: String },

    #[error("router on '{from}' declares output '{value}' with no mapped target")]
    #[diagnostic(
        code(stateloom::graph::unmapped_router_output),
        help("every value the router can return must map to a step or End")
    )]
    UnmappedRouterOutput { from: String, value: String },

    #[error("mapping on '{from}' names value '{value}' the router never returns")]
    #[diagnostic(code(stateloom::graph::undeclared_mapping_value))]
    UndeclaredMappingValue { from: String, value: String },

    #[error("step '{0}' is unreachable from the entry point")]
    #[diagnostic(code(stateloom::graph::unreachable_step))]
    UnreachableStep(String),

    #[error("no path from the entry point reaches End")]
    #[diagnostic(
        code(stateloom::graph::no_terminal_path),
        help("at least one edge or router mapping must target End")
    )]
    NoTerminalPath,

    #[error("suspension mark on unregistered step '{0}'")]
    #[diagnostic(code(stateloom::graph::unknown_suspension))]
    UnknownSuspensionStep(String),
}

/// A validated, executable workflow graph.
///
/// Immutable after compilation; the engine shares it across sessions.
pub struct Graph {
    steps: FxHashMap<StepId, Arc<dyn Step>>,
    edges: FxHashMap<StepId, Edge>,
    entry_point: StepId,
    suspension_steps: HashSet<StepId>,
}

impl Graph {
    pub(super) fn from_builder(builder: GraphBuilder) -> Result<Self, GraphDefinitionError> {
        let GraphBuilder {
            steps,
            edges,
            entry_point,
            suspension_steps,
        } = builder;

        let entry_point = entry_point.ok_or(GraphDefinitionError::MissingEntryPoint)?;
        if !steps.contains_key(&entry_point) {
            return Err(GraphDefinitionError::UnknownEntryPoint(
                entry_point.to_string(),
            ));
        }

        for from in edges.keys() {
            if !steps.contains_key(from) {
                return Err(GraphDefinitionError::EdgeFromUnknownStep(from.to_string()));
            }
        }
        for id in steps.keys() {
            if !edges.contains_key(id) {
                return Err(GraphDefinitionError::MissingEdge(id.to_string()));
            }
        }

        for (from, edge) in &edges {
            match edge {
                Edge::Static(target) => {
                    Self::check_target(&steps, from, target)?;
                }
                Edge::Conditional(cond) => {
                    for target in cond.targets() {
                        Self::check_target(&steps, from, target)?;
                    }
                    let declared: HashSet<&str> =
                        cond.router().outputs().iter().map(String::as_str).collect();
                    for value in &declared {
                        if !cond.mapping().contains_key(*value) {
                            return Err(GraphDefinitionError::UnmappedRouterOutput {
                                from: from.to_string(),
                                value: (*value).to_string(),
                            });
                        }
                    }
                    for value in cond.mapping().keys() {
                        if !declared.contains(value.as_str()) {
                            return Err(GraphDefinitionError::UndeclaredMappingValue {
                                from: from.to_string(),
                                value: value.clone(),
                            });
                        }
                    }
                }
            }
        }

        for id in &suspension_steps {
            if !steps.contains_key(id) {
                return Err(GraphDefinitionError::UnknownSuspensionStep(id.to_string()));
            }
        }

        let reachable = Self::reachable_from(&entry_point, &edges);
        for id in steps.keys() {
            if !reachable.contains(id) {
                return Err(GraphDefinitionError::UnreachableStep(id.to_string()));
            }
        }
        if !reachable.contains(&StepId::End) {
            return Err(GraphDefinitionError::NoTerminalPath);
        }

        debug!(
            steps = steps.len(),
            entry = %entry_point,
            suspensions = suspension_steps.len(),
            "graph compiled"
        );

        Ok(Self {
            steps,
            edges,
            entry_point,
            suspension_steps,
        })
    }

    fn check_target(
        steps: &FxHashMap<StepId, Arc<dyn Step>>,
        from: &StepId,
        target: &StepId,
    ) -> Result<(), GraphDefinitionError> {
        if target.is_end() || steps.contains_key(target) {
            Ok(())
        } else {
            Err(GraphDefinitionError::UnknownTarget {
                from: from.to_string(),
                to: target.to_string(),
            })
        }
    }

    fn reachable_from(entry: &StepId, edges: &FxHashMap<StepId, Edge>) -> HashSet<StepId> {
        let mut seen = HashSet::new();
        let mut stack = vec![entry.clone()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(edge) = edges.get(&id) {
                match edge {
                    Edge::Static(target) => stack.push(target.clone()),
                    Edge::Conditional(cond) => {
                        stack.extend(cond.targets().cloned());
                    }
                }
            }
        }
        seen
    }

    /// The step every fresh run begins at.
    #[must_use]
    pub fn entry_point(&self) -> &StepId {
        &self.entry_point
    }

    /// Looks up the runnable implementation of a step.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&Arc<dyn Step>> {
        self.steps.get(id)
    }

    /// Looks up a step's outgoing edge.
    #[must_use]
    pub fn edge(&self, id: &StepId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// True when the step is a suspension point.
    #[must_use]
    pub fn is_suspension(&self, id: &StepId) -> bool {
        self.suspension_steps.contains(id)
    }

    /// Ids of all registered steps, in no particular order.
    pub fn step_ids(&self) -> impl Iterator<Item = &StepId> {
        self.steps.keys()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("entry_point", &self.entry_point)
            .field("suspension_steps", &self.suspension_steps)
            .finish_non_exhaustive()
    }
}
