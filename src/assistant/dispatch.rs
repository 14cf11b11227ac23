//! Tool-call dispatch step.

use async_trait::async_trait;
use tracing::debug;

use crate::state::{Patch, SessionState, StatePatch};
use crate::step::{Step, StepContext, StepError};
use crate::tools::ToolRegistry;

/// Executes the tool calls requested by the latest assistant message.
///
/// Each call yields exactly one tool-role message, appended in call order;
/// `tools_used` is overwritten with the names that succeeded. Reaching this
/// step without pending tool calls indicates broken routing upstream.
pub struct DispatchToolsStep {
    tools: ToolRegistry,
}

impl DispatchToolsStep {
    #[must_use]
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Step for DispatchToolsStep {
    async fn run(
        &self,
        state: &SessionState,
        _ctx: StepContext,
    ) -> Result<StatePatch, StepError> {
        let calls = state
            .last_message()
            .filter(|m| m.has_tool_calls())
            .map(|m| m.tool_calls.clone())
            .ok_or_else(|| StepError::MissingInput {
                what: "an assistant message with pending tool calls".to_string(),
            })?;

        let outcome = self.tools.dispatch(&calls).await;
        debug!(
            calls = calls.len(),
            succeeded = outcome.tools_used.len(),
            "tool dispatch finished"
        );

        let messages = outcome.results.iter().map(Into::into).collect();
        Ok(StatePatch::new()
            .append_messages(messages)
            .with_tools_used(Patch::Set(outcome.tools_used)))
    }
}
