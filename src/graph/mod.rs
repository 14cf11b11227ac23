//! Graph definition: step identifiers, edges, the fluent builder, and the
//! validated compiled form.
//!
//! A workflow graph is built declaratively with [`GraphBuilder`] and turned
//! into an executable [`Graph`] by `compile()`, which performs all structural
//! validation up front. Nothing about a compiled graph can fail structurally
//! at runtime.

pub mod builder;
pub mod compile;
pub mod edges;

pub use builder::GraphBuilder;
pub use compile::{Graph, GraphDefinitionError};
pub use edges::{Edge, Router};

use serde::{Deserialize, Serialize};

/// Identifier of a position in a workflow graph.
///
/// `End` is a virtual terminal: it cannot be registered as a step, only
/// targeted by edges. Reaching it completes the run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    /// A registered, runnable step.
    Named(String),
    /// The virtual terminal position.
    End,
}

impl StepId {
    /// Stable string form used in checkpoints and logs.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            StepId::Named(name) => format!("step:{name}"),
            StepId::End => "end".to_string(),
        }
    }

    /// Parses the string form produced by [`encode`](Self::encode).
    ///
    /// Unprefixed input is treated as a named step, so hand-written ids keep
    /// working.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        match raw {
            "end" => StepId::End,
            other => StepId::Named(
                other
                    .strip_prefix("step:")
                    .unwrap_or(other)
                    .to_string(),
            ),
        }
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, StepId::End)
    }

    /// The step's name, when it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            StepId::Named(name) => Some(name),
            StepId::End => None,
        }
    }
}

impl From<&str> for StepId {
    fn from(name: &str) -> Self {
        StepId::Named(name.to_string())
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepId::Named(name) => write!(f, "{name}"),
            StepId::End => write!(f, "END"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Encode and decode are inverse on both variants.
    fn test_step_id_codec() {
        let named = StepId::from("validate-input");
        assert_eq!(named.encode(), "step:validate-input");
        assert_eq!(StepId::decode(&named.encode()), named);

        assert_eq!(StepId::End.encode(), "end");
        assert_eq!(StepId::decode("end"), StepId::End);
    }

    #[test]
    /// Unprefixed input decodes as a named step.
    fn test_step_id_decode_bare_name() {
        assert_eq!(StepId::decode("decision"), StepId::from("decision"));
    }

    #[test]
    fn test_step_id_display() {
        assert_eq!(StepId::from("finalize").to_string(), "finalize");
        assert_eq!(StepId::End.to_string(), "END");
    }
}
