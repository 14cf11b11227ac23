//! The feedback cycle: suspend for review, then fold feedback back in.

use async_trait::async_trait;
use tracing::info;

use crate::graph::Router;
use crate::message::Message;
use crate::state::{Patch, SessionState, StatePatch};
use crate::step::{Step, StepContext, StepError};

/// Presents the answer for review and suspends the session.
///
/// Copies the latest message's content into `final_answer` (the empty
/// string when the history is empty) and clears the conversation history:
/// the answer is what travels across the suspension, and the next cycle
/// starts from a clean transcript.
pub struct AwaitFeedbackStep;

#[async_trait]
impl Step for AwaitFeedbackStep {
    async fn run(
        &self,
        state: &SessionState,
        _ctx: StepContext,
    ) -> Result<StatePatch, StepError> {
        let answer = state
            .last_message()
            .map_or_else(String::new, |last| last.content.clone());
        Ok(StatePatch::new()
            .clear_messages()
            .with_final_answer(Patch::Set(answer)))
    }
}

/// Consumes caller feedback and rearms the session for a revision pass.
///
/// The feedback text itself arrives as a user message in the resume input;
/// this step only records it, unsets `user_feedback` so the cycle is not
/// re-triggered, and clears `final_answer` to force regeneration.
pub struct ApplyFeedbackStep;

#[async_trait]
impl Step for ApplyFeedbackStep {
    async fn run(
        &self,
        state: &SessionState,
        _ctx: StepContext,
    ) -> Result<StatePatch, StepError> {
        let last_user = state
            .messages
            .iter()
            .rev()
            .find(|m| m.has_role(Message::USER));
        match last_user {
            Some(message) => info!(feedback = %message.content, "feedback received"),
            None => info!("feedback received without an accompanying user message"),
        }

        Ok(StatePatch::new()
            .with_user_feedback(Patch::Clear)
            .with_final_answer(Patch::Clear)
            .with_is_valid(Patch::Set(true)))
    }
}

/// Routes `feedback` when non-empty feedback arrived with the resume,
/// `done` otherwise.
#[must_use]
pub fn route_feedback() -> Router {
    Router::new(["feedback", "done"], |state: &SessionState| {
        let has_feedback = state
            .user_feedback
            .as_deref()
            .is_some_and(|fb| !fb.trim().is_empty());
        if has_feedback {
            "feedback".to_string()
        } else {
            "done".to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MessagesPatch;

    fn ctx() -> StepContext {
        StepContext::new("s", 0)
    }

    #[tokio::test]
    /// The answer is lifted out of the history before the history is cleared.
    async fn test_await_feedback_extracts_answer() {
        let mut state = SessionState::with_user_message("question");
        state.messages.push(Message::assistant("the answer"));
        let patch = AwaitFeedbackStep.run(&state, ctx()).await.unwrap();
        assert_eq!(patch.messages, MessagesPatch::Clear);
        assert_eq!(patch.final_answer, Patch::Set("the answer".to_string()));
    }

    #[tokio::test]
    /// An empty history yields an empty answer, not a stale one.
    async fn test_await_feedback_empty_history() {
        let patch = AwaitFeedbackStep
            .run(&SessionState::default(), ctx())
            .await
            .unwrap();
        assert_eq!(patch.final_answer, Patch::Set(String::new()));
    }

    #[tokio::test]
    /// Feedback is consumed and the stale answer cleared; the history is the
    /// caller's to extend.
    async fn test_apply_feedback() {
        let mut state = SessionState::with_user_message("make it shorter");
        state.final_answer = Some("draft answer".to_string());
        state.user_feedback = Some("make it shorter".to_string());

        let patch = ApplyFeedbackStep.run(&state, ctx()).await.unwrap();
        assert_eq!(patch.messages, MessagesPatch::Keep);
        assert_eq!(patch.user_feedback, Patch::Clear);
        assert_eq!(patch.final_answer, Patch::Clear);
        assert_eq!(patch.is_valid, Patch::Set(true));
    }

    #[tokio::test]
    /// No accompanying user message is tolerated; the clears still happen.
    async fn test_apply_feedback_without_user_message() {
        let mut state = SessionState::default();
        state.user_feedback = Some("shorter".to_string());
        let patch = ApplyFeedbackStep.run(&state, ctx()).await.unwrap();
        assert_eq!(patch.user_feedback, Patch::Clear);
        assert_eq!(patch.final_answer, Patch::Clear);
    }

    #[test]
    /// Blank feedback counts as done, not as a revision request.
    fn test_feedback_router() {
        let router = route_feedback();
        let mut state = SessionState::default();
        assert_eq!(router.decide(&state), "done");

        state.user_feedback = Some("   ".to_string());
        assert_eq!(router.decide(&state), "done");

        state.user_feedback = Some("add sources".to_string());
        assert_eq!(router.decide(&state), "feedback");
    }
}
