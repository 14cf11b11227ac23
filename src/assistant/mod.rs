//! A ready-made assistant workflow: validate, decide, dispatch tools,
//! finalize, and loop on human feedback.
//!
//! This module is the crate's bundled demonstration of the engine: an
//! information-assistant graph whose model and validator are injected
//! collaborator trait objects, so no network backend lives here. The
//! topology:
//!
//! ```text
//! validate-input ──invalid──▶ END
//!       │ valid
//!       ▼
//!   decision ──tools──▶ dispatch-tools ──▶ finalize
//!       │ finalize                            │
//!       └────────────────▶ finalize ◀─────────┘
//!                             │
//!                             ▼
//!                      await-feedback (suspension) ──done──▶ END
//!                             │ feedback
//!                             ▼
//!                      apply-feedback ──▶ decision   (the revision cycle)
//! ```

pub mod decision;
pub mod dispatch;
pub mod feedback;
pub mod validate;

pub use decision::{DecisionStep, route_tool_use};
pub use dispatch::DispatchToolsStep;
pub use feedback::{ApplyFeedbackStep, AwaitFeedbackStep, route_feedback};
pub use validate::{NO_MESSAGE_PROVIDED, ValidateInputStep, route_validation};

use std::sync::Arc;

use crate::collaborators::{DecisionModel, QueryValidator};
use crate::graph::{Graph, GraphBuilder, GraphDefinitionError, StepId};
use crate::step::Step;
use crate::tools::ToolRegistry;

/// Step name: input validation gate.
pub const VALIDATE_INPUT: &str = "validate-input";
/// Step name: first decision-model invocation.
pub const DECISION: &str = "decision";
/// Step name: tool-call dispatch.
pub const DISPATCH_TOOLS: &str = "dispatch-tools";
/// Step name: decision-model invocation that produces the answer.
pub const FINALIZE: &str = "finalize";
/// Step name: suspension point awaiting caller feedback.
pub const AWAIT_FEEDBACK: &str = "await-feedback";
/// Step name: fold feedback back into the conversation.
pub const APPLY_FEEDBACK: &str = "apply-feedback";

/// Collaborators and tools wired into the assistant graph.
///
/// Everything external is injected here; the graph owns no backends.
pub struct AssistantConfig {
    pub decision: Arc<dyn DecisionModel>,
    pub validator: Arc<dyn QueryValidator>,
    pub tools: ToolRegistry,
}

/// Builds the feedback-loop assistant graph from the given collaborators.
///
/// `decision` and `finalize` are the same [`DecisionStep`] registered at two
/// graph positions: the first invocation may request tools, the second turns
/// tool results into the answer.
pub fn build_feedback_graph(config: AssistantConfig) -> Result<Graph, GraphDefinitionError> {
    let decide: Arc<dyn Step> = Arc::new(DecisionStep::new(config.decision));

    GraphBuilder::new()
        .add_step(VALIDATE_INPUT, ValidateInputStep::new(config.validator))
        .add_shared_step(DECISION, Arc::clone(&decide))
        .add_step(DISPATCH_TOOLS, DispatchToolsStep::new(config.tools))
        .add_shared_step(FINALIZE, decide)
        .add_step(AWAIT_FEEDBACK, AwaitFeedbackStep)
        .add_step(APPLY_FEEDBACK, ApplyFeedbackStep)
        .set_entry_point(VALIDATE_INPUT)
        .add_conditional_edge(
            VALIDATE_INPUT,
            route_validation(),
            [
                ("valid", StepId::from(DECISION)),
                ("invalid", StepId::End),
            ],
        )
        .add_conditional_edge(
            DECISION,
            route_tool_use(),
            [
                ("tools", StepId::from(DISPATCH_TOOLS)),
                ("finalize", StepId::from(FINALIZE)),
            ],
        )
        .add_edge(DISPATCH_TOOLS, FINALIZE)
        .add_edge(FINALIZE, AWAIT_FEEDBACK)
        .mark_suspension(AWAIT_FEEDBACK)
        .add_conditional_edge(
            AWAIT_FEEDBACK,
            route_feedback(),
            [
                ("feedback", StepId::from(APPLY_FEEDBACK)),
                ("done", StepId::End),
            ],
        )
        .add_edge(APPLY_FEEDBACK, DECISION)
        .compile()
}
