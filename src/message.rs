use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message in a session's conversation history.
///
/// Messages are the accumulating unit of session state: user input, assistant
/// responses (optionally carrying requested [`ToolCall`]s), and tool results.
/// Each message has a role and text content; tool metadata is only populated
/// for the roles that use it.
///
/// # Examples
///
/// ```
/// use stateloom::message::Message;
///
/// let user_msg = Message::user("What's the weather in Accra?");
/// let assistant_msg = Message::assistant("Let me check that for you.");
///
/// assert!(user_msg.has_role(Message::USER));
/// assert!(user_msg.tool_calls.is_empty());
/// ```
///
/// # Serialization
///
/// Messages serialize to JSON for checkpoint persistence; empty tool metadata
/// is omitted from the serialized form.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (e.g., "user", "assistant", "tool").
    ///
    /// Use the constants on [`Message`] for standardized values.
    pub role: String,
    /// The text content of the message.
    pub content: String,
    /// Tool invocations requested by this message (assistant messages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool-result messages, the id of the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// Assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";
    /// Tool result message role.
    pub const TOOL: &'static str = "tool";

    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates an assistant message that requests the given tool invocations.
    #[must_use]
    pub fn assistant_with_tool_calls(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Self::ASSISTANT, content)
        }
    }

    /// Creates a system message with the specified content.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Creates a tool-result message answering the call with id `call_id`.
    #[must_use]
    pub fn tool(call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(call_id.to_string()),
            ..Self::new(Self::TOOL, content)
        }
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Returns true if this message requests any tool invocations.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A requested external-capability invocation, carried on an assistant message.
///
/// Tool calls are emitted by the decision collaborator and consumed exactly
/// once by the dispatcher, which answers each with a [`ToolResult`].
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolCall {
    /// Caller-assigned identifier, echoed back in the matching result.
    pub id: String,
    /// Registered tool name to invoke.
    pub name: String,
    /// Named arguments passed to the tool.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Creates a tool call with the given id, name, and arguments.
    #[must_use]
    pub fn new(id: &str, name: &str, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }
}

/// The outcome of dispatching a single [`ToolCall`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the call this result answers.
    pub call_id: String,
    /// Name of the tool that was requested.
    pub tool_name: String,
    /// Result content, or a failure/not-found sentinel string.
    pub content: String,
}

impl From<&ToolResult> for Message {
    fn from(result: &ToolResult) -> Self {
        Message::tool(&result.call_id, &result.content)
    }
}
