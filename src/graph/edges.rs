//! Edge kinds: static successors and router-driven conditional branches.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::state::SessionState;

use super::StepId;

/// Routing function for a conditional edge.
///
/// A router inspects the session state and returns one of its declared
/// `outputs`. Declaring the output set up front is what lets graph
/// compilation prove every routable value has a mapped target, so routing
/// cannot dead-end at runtime.
#[derive(Clone)]
pub struct Router {
    outputs: Vec<String>,
    decide: Arc<dyn Fn(&SessionState) -> String + Send + Sync>,
}

impl Router {
    /// Creates a router from its declared output set and decision function.
    ///
    /// The function must only ever return values listed in `outputs`;
    /// returning anything else is a contract violation surfaced by the
    /// engine as an error.
    #[must_use]
    pub fn new<F>(outputs: impl IntoIterator<Item = impl Into<String>>, decide: F) -> Self
    where
        F: Fn(&SessionState) -> String + Send + Sync + 'static,
    {
        Self {
            outputs: outputs.into_iter().map(Into::into).collect(),
            decide: Arc::new(decide),
        }
    }

    /// The declared set of values [`decide`](Self::decide) may return.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Evaluates the router against the current state.
    #[must_use]
    pub fn decide(&self, state: &SessionState) -> String {
        (self.decide)(state)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// A step's single outgoing edge.
#[derive(Clone, Debug)]
pub enum Edge {
    /// Unconditional successor.
    Static(StepId),
    /// Router-selected successor.
    Conditional(ConditionalEdge),
}

impl Edge {
    /// Resolves this edge against the current state.
    ///
    /// `None` means the router returned a value outside its declared output
    /// set, which compilation could not have mapped.
    #[must_use]
    pub fn resolve(&self, state: &SessionState) -> Option<(StepId, Option<String>)> {
        match self {
            Edge::Static(target) => Some((target.clone(), None)),
            Edge::Conditional(cond) => {
                let value = cond.router.decide(state);
                cond.mapping
                    .get(&value)
                    .cloned()
                    .map(|target| (target, Some(value)))
            }
        }
    }
}

/// A conditional edge: a router plus the value-to-target mapping.
#[derive(Clone, Debug)]
pub struct ConditionalEdge {
    router: Router,
    mapping: FxHashMap<String, StepId>,
}

impl ConditionalEdge {
    #[must_use]
    pub fn new(router: Router, mapping: FxHashMap<String, StepId>) -> Self {
        Self { router, mapping }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn mapping(&self) -> &FxHashMap<String, StepId> {
        &self.mapping
    }

    /// Targets of this edge, for reachability analysis.
    pub fn targets(&self) -> impl Iterator<Item = &StepId> {
        self.mapping.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_on_validity() -> Router {
        Router::new(["valid", "invalid"], |state: &SessionState| {
            if state.is_valid == Some(true) {
                "valid".to_string()
            } else {
                "invalid".to_string()
            }
        })
    }

    #[test]
    /// A static edge always resolves to its target with no router value.
    fn test_static_edge_resolution() {
        let edge = Edge::Static(StepId::from("finalize"));
        let (target, value) = edge.resolve(&SessionState::default()).unwrap();
        assert_eq!(target, StepId::from("finalize"));
        assert!(value.is_none());
    }

    #[test]
    /// A conditional edge follows the router through the mapping.
    fn test_conditional_edge_resolution() {
        let mut mapping = FxHashMap::default();
        mapping.insert("valid".to_string(), StepId::from("decision"));
        mapping.insert("invalid".to_string(), StepId::End);
        let edge = Edge::Conditional(ConditionalEdge::new(route_on_validity(), mapping));

        let mut state = SessionState::default();
        state.is_valid = Some(true);
        let (target, value) = edge.resolve(&state).unwrap();
        assert_eq!(target, StepId::from("decision"));
        assert_eq!(value.as_deref(), Some("valid"));

        state.is_valid = Some(false);
        let (target, _) = edge.resolve(&state).unwrap();
        assert_eq!(target, StepId::End);
    }

    #[test]
    /// A router value missing from the mapping resolves to None.
    fn test_unmapped_value_resolves_none() {
        let mut mapping = FxHashMap::default();
        mapping.insert("valid".to_string(), StepId::from("decision"));
        let edge = Edge::Conditional(ConditionalEdge::new(route_on_validity(), mapping));

        // is_valid unset routes to "invalid", which is not mapped here.
        assert!(edge.resolve(&SessionState::default()).is_none());
    }
}
