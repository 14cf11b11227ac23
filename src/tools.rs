//! Tool registry and best-effort batch dispatch.
//!
//! Tools are external capabilities invoked by name with JSON arguments. The
//! dispatcher is deliberately forgiving: an unknown name or a failing tool
//! produces a result message rather than aborting the batch, so one bad call
//! never starves its siblings. Only successful invocations count toward
//! `tools_used`.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::message::{ToolCall, ToolResult};

/// Result content recorded for a call naming an unregistered tool.
pub const TOOL_NOT_FOUND: &str = "Tool not found.";

/// Failure raised by a tool implementation.
///
/// Never escapes the dispatcher; [`ToolRegistry::dispatch`] converts it into
/// a failure-string result.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    #[diagnostic(code(stateloom::tool::invalid_arguments))]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    #[diagnostic(code(stateloom::tool::execution_failed))]
    ExecutionFailed(String),
}

/// An invocable external capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name tool calls are matched against.
    fn name(&self) -> &str;

    /// Invokes the tool with named JSON arguments, producing text content.
    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<String, ToolError>;
}

/// Outcome of dispatching a batch of tool calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// One result per call, in call order. Includes not-found and failure
    /// sentinels.
    pub results: Vec<ToolResult>,
    /// Names of the tools that completed successfully, in invocation order.
    pub tools_used: Vec<String>,
}

/// Name-keyed collection of [`Tool`] implementations.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its own name, replacing any previous
    /// registration of that name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatches each call to its named tool, best effort.
    ///
    /// Every call gets exactly one result, in call order. Unknown names get
    /// the [`TOOL_NOT_FOUND`] sentinel; a tool error is caught here and
    /// recorded as a failure string. Neither counts toward `tools_used`.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> DispatchOutcome {
        let mut results = Vec::with_capacity(calls.len());
        let mut tools_used = Vec::new();

        for call in calls {
            let content = match self.tools.get(&call.name) {
                None => {
                    warn!(tool = %call.name, call_id = %call.id, "tool not registered");
                    TOOL_NOT_FOUND.to_string()
                }
                Some(tool) => match tool.invoke(&call.arguments).await {
                    Ok(content) => {
                        debug!(tool = %call.name, call_id = %call.id, "tool call succeeded");
                        tools_used.push(call.name.clone());
                        content
                    }
                    Err(err) => {
                        warn!(tool = %call.name, call_id = %call.id, error = %err, "tool call failed");
                        format!("Tool '{}' failed: {err}", call.name)
                    }
                },
            };
            results.push(ToolResult {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                content,
            });
        }

        DispatchOutcome {
            results,
            tools_used,
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
