//! The decision step: one invocation of the decision model.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::collaborators::DecisionModel;
use crate::graph::Router;
use crate::state::{Patch, SessionState, StatePatch};
use crate::step::{Step, StepContext, StepError};

/// Invokes the decision model over the conversation so far.
///
/// Serves two graph positions: the first pass, whose response may request
/// tools, and the finalize pass after dispatch. Both passes record the
/// response content as the running `final_answer`; the first one ever
/// produced also lands in `original_response` through its first-write-wins
/// policy.
pub struct DecisionStep {
    model: Arc<dyn DecisionModel>,
}

impl DecisionStep {
    #[must_use]
    pub fn new(model: Arc<dyn DecisionModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Step for DecisionStep {
    async fn run(
        &self,
        state: &SessionState,
        _ctx: StepContext,
    ) -> Result<StatePatch, StepError> {
        let response = self.model.invoke(&state.messages).await?;
        debug!(
            tool_calls = response.tool_calls.len(),
            "decision model responded"
        );
        // A tool-requesting response is not an answer; record answers only
        // on the terminal pass.
        if response.has_tool_calls() {
            return Ok(StatePatch::new()
                .append_messages(vec![response])
                .with_is_valid(Patch::Set(true)));
        }
        let content = response.content.clone();
        Ok(StatePatch::new()
            .append_messages(vec![response])
            .with_final_answer(Patch::Set(content.clone()))
            .with_original_response(Patch::Set(content))
            .with_is_valid(Patch::Set(true)))
    }
}

/// Routes `tools` when the latest message requests tool calls, `finalize`
/// otherwise.
#[must_use]
pub fn route_tool_use() -> Router {
    Router::new(["tools", "finalize"], |state: &SessionState| {
        let wants_tools = state
            .last_message()
            .is_some_and(crate::message::Message::has_tool_calls);
        if wants_tools {
            "tools".to_string()
        } else {
            "finalize".to_string()
        }
    })
}
