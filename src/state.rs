//! Session state and per-field merge policies.
//!
//! The unit of data threaded through a workflow graph is [`SessionState`].
//! Steps never mutate it directly: each step returns a [`StatePatch`] and the
//! engine merges it through [`SessionState::apply`], which owns the merge
//! policy of every field. Exactly one policy exists per field, fixed for the
//! lifetime of the graph:
//!
//! - `messages` accumulates: patches **append** to the existing sequence.
//!   The only exception is an explicit [`MessagesPatch::Clear`], used by
//!   steps that hand a conversation back to the caller.
//! - `original_response` is set once (first write wins).
//! - Every other field is overwrite-or-absent: a patch either sets it,
//!   clears it, or leaves it untouched.
//!
//! # Examples
//!
//! ```
//! use stateloom::message::Message;
//! use stateloom::state::{Patch, SessionState, StatePatch};
//!
//! let mut state = SessionState::with_user_message("Tell me about Accra");
//! state.apply(
//!     StatePatch::new()
//!         .append_messages(vec![Message::assistant("Accra is the capital of Ghana.")])
//!         .with_final_answer(Patch::Set("Accra is the capital of Ghana.".to_string())),
//! );
//!
//! assert_eq!(state.messages.len(), 2);
//! assert!(state.final_answer.is_some());
//! ```

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Mutable, mergeable session state threaded through the graph.
///
/// All fields besides `messages` and `tools_used` are optional flags and
/// strings that individual steps set or clear; see the field docs for who
/// writes what.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Ordered conversation history. Merge policy: append.
    pub messages: Vec<Message>,
    /// First terminal answer ever produced for this session, kept for
    /// audit/diff purposes. Set once, never overwritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_response: Option<String>,
    /// Most recent terminal answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    /// Human-readable reason the last validation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    /// Gate into the main pipeline; unset until validation has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    /// Present while the session is in a feedback-revision cycle; cleared by
    /// the step that consumes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<String>,
    /// Tool names invoked by the most recent dispatch, in invocation order.
    /// Merge policy: overwrite.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,
}

impl SessionState {
    /// Creates a session state holding a single user message.
    ///
    /// The usual way a caller seeds a fresh session.
    #[must_use]
    pub fn with_user_message(content: &str) -> Self {
        Self {
            messages: vec![Message::user(content)],
            ..Self::default()
        }
    }

    /// Returns the last message in the history, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Merges a partial update into this state, field by field.
    ///
    /// This is the only merge path in the crate: the engine calls it for step
    /// outputs and for caller input at resume time. Policies are fixed here,
    /// never chosen by a step.
    pub fn apply(&mut self, patch: StatePatch) {
        match patch.messages {
            MessagesPatch::Keep => {}
            MessagesPatch::Append(new) => self.messages.extend(new),
            MessagesPatch::Clear => self.messages.clear(),
        }
        // First write wins: later terminal answers land in final_answer only.
        if self.original_response.is_none() {
            if let Patch::Set(v) = patch.original_response {
                self.original_response = Some(v);
            }
        }
        patch.final_answer.apply_to(&mut self.final_answer);
        patch.validation_error.apply_to(&mut self.validation_error);
        patch.is_valid.apply_to(&mut self.is_valid);
        patch.user_feedback.apply_to(&mut self.user_feedback);
        match patch.tools_used {
            Patch::Keep => {}
            Patch::Set(v) => self.tools_used = v,
            Patch::Clear => self.tools_used.clear(),
        }
    }
}

/// Per-field update instruction for overwrite-policy fields.
///
/// The default is [`Patch::Keep`], so a `StatePatch` only touches the fields
/// a step explicitly writes.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Leave the field unchanged.
    #[default]
    Keep,
    /// Overwrite the field with this value.
    Set(T),
    /// Unset the field.
    Clear,
}

impl<T> Patch<T> {
    fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(v) => *slot = Some(v),
            Patch::Clear => *slot = None,
        }
    }
}

/// Update instruction for the accumulating `messages` field.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum MessagesPatch {
    /// Leave the history unchanged.
    #[default]
    Keep,
    /// Concatenate these messages onto the existing history.
    Append(Vec<Message>),
    /// Empty the history. The explicit carve-out from the append policy,
    /// used when a conversation is handed back to the caller.
    Clear,
}

/// Partial state update returned by a step (or supplied by a caller at
/// resume time).
///
/// All fields default to "keep", so steps build patches with only the fields
/// they care about:
///
/// ```
/// use stateloom::message::Message;
/// use stateloom::state::{Patch, StatePatch};
///
/// let patch = StatePatch::new()
///     .append_messages(vec![Message::assistant("done")])
///     .with_is_valid(Patch::Set(true));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StatePatch {
    pub messages: MessagesPatch,
    pub original_response: Patch<String>,
    pub final_answer: Patch<String>,
    pub validation_error: Patch<String>,
    pub is_valid: Patch<bool>,
    pub user_feedback: Patch<String>,
    pub tools_used: Patch<Vec<String>>,
}

impl StatePatch {
    /// Creates an empty patch that keeps every field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Appends messages to the history.
    #[must_use]
    pub fn append_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = MessagesPatch::Append(messages);
        self
    }

    /// Empties the message history.
    #[must_use]
    pub fn clear_messages(mut self) -> Self {
        self.messages = MessagesPatch::Clear;
        self
    }

    #[must_use]
    pub fn with_original_response(mut self, patch: Patch<String>) -> Self {
        self.original_response = patch;
        self
    }

    #[must_use]
    pub fn with_final_answer(mut self, patch: Patch<String>) -> Self {
        self.final_answer = patch;
        self
    }

    #[must_use]
    pub fn with_validation_error(mut self, patch: Patch<String>) -> Self {
        self.validation_error = patch;
        self
    }

    #[must_use]
    pub fn with_is_valid(mut self, patch: Patch<bool>) -> Self {
        self.is_valid = patch;
        self
    }

    #[must_use]
    pub fn with_user_feedback(mut self, patch: Patch<String>) -> Self {
        self.user_feedback = patch;
        self
    }

    #[must_use]
    pub fn with_tools_used(mut self, patch: Patch<Vec<String>>) -> Self {
        self.tools_used = patch;
        self
    }
}
