//! Input validation gate for the assistant graph.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::collaborators::QueryValidator;
use crate::graph::Router;
use crate::state::{Patch, SessionState, StatePatch};
use crate::step::{Step, StepContext, StepError};

/// Validation error recorded when a session starts with no message at all.
pub const NO_MESSAGE_PROVIDED: &str = "No message provided.";

/// Validates the user's query before the session enters the main pipeline.
///
/// Skipped whenever `user_feedback` is present: a session inside the
/// revision cycle has already been validated, and the feedback itself is not
/// a query.
pub struct ValidateInputStep {
    validator: Arc<dyn QueryValidator>,
}

impl ValidateInputStep {
    #[must_use]
    pub fn new(validator: Arc<dyn QueryValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Step for ValidateInputStep {
    async fn run(
        &self,
        state: &SessionState,
        _ctx: StepContext,
    ) -> Result<StatePatch, StepError> {
        if state.user_feedback.is_some() {
            debug!("feedback present, skipping validation");
            return Ok(StatePatch::new().with_is_valid(Patch::Set(true)));
        }

        let Some(last) = state.last_message() else {
            return Ok(StatePatch::new()
                .with_is_valid(Patch::Set(false))
                .with_validation_error(Patch::Set(NO_MESSAGE_PROVIDED.to_string())));
        };

        let facets = self.validator.invoke(last).await?;
        if facets.is_valid() {
            debug!(location = %facets.location, topic = %facets.topic, "query accepted");
            Ok(StatePatch::new()
                .with_is_valid(Patch::Set(true))
                .with_validation_error(Patch::Clear))
        } else {
            Ok(StatePatch::new()
                .with_is_valid(Patch::Set(false))
                .with_validation_error(Patch::Set(
                    "Could not determine a location or topic from the query.".to_string(),
                )))
        }
    }
}

/// Routes `valid` when the gate passed, `invalid` otherwise.
#[must_use]
pub fn route_validation() -> Router {
    Router::new(["valid", "invalid"], |state: &SessionState| {
        if state.is_valid == Some(true) {
            "valid".to_string()
        } else {
            "invalid".to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CollaboratorError, QueryFacets};
    use crate::message::Message;

    struct FixedValidator(QueryFacets);

    #[async_trait]
    impl QueryValidator for FixedValidator {
        async fn invoke(&self, _message: &Message) -> Result<QueryFacets, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    fn ctx() -> StepContext {
        StepContext::new("test-session", 0)
    }

    #[tokio::test]
    /// An empty history is invalid without consulting the validator.
    async fn test_empty_history_invalid() {
        let step = ValidateInputStep::new(Arc::new(FixedValidator(QueryFacets::invalid())));
        let patch = step.run(&SessionState::default(), ctx()).await.unwrap();
        assert_eq!(patch.is_valid, Patch::Set(false));
        assert_eq!(
            patch.validation_error,
            Patch::Set(NO_MESSAGE_PROVIDED.to_string())
        );
    }

    #[tokio::test]
    /// Present feedback short-circuits validation entirely.
    async fn test_feedback_skips_validation() {
        let step = ValidateInputStep::new(Arc::new(FixedValidator(QueryFacets::invalid())));
        let mut state = SessionState::default();
        state.user_feedback = Some("shorter please".to_string());
        let patch = step.run(&state, ctx()).await.unwrap();
        assert_eq!(patch.is_valid, Patch::Set(true));
        assert_eq!(patch.validation_error, Patch::Keep);
    }

    #[tokio::test]
    async fn test_answerable_query_passes() {
        let step = ValidateInputStep::new(Arc::new(FixedValidator(QueryFacets::new(
            "Accra",
            "Accra weather",
        ))));
        let state = SessionState::with_user_message("weather in Accra?");
        let patch = step.run(&state, ctx()).await.unwrap();
        assert_eq!(patch.is_valid, Patch::Set(true));
        assert_eq!(patch.validation_error, Patch::Clear);
    }

    #[tokio::test]
    /// One resolved facet is not enough; both must be determined.
    async fn test_partially_resolved_query_fails() {
        let step = ValidateInputStep::new(Arc::new(FixedValidator(QueryFacets::new(
            "Accra",
            QueryFacets::INVALID,
        ))));
        let state = SessionState::with_user_message("Accra?");
        let patch = step.run(&state, ctx()).await.unwrap();
        assert_eq!(patch.is_valid, Patch::Set(false));
        assert!(matches!(patch.validation_error, Patch::Set(_)));
    }

    #[tokio::test]
    async fn test_unanswerable_query_fails() {
        let step = ValidateInputStep::new(Arc::new(FixedValidator(QueryFacets::invalid())));
        let state = SessionState::with_user_message("asdf");
        let patch = step.run(&state, ctx()).await.unwrap();
        assert_eq!(patch.is_valid, Patch::Set(false));
        assert!(matches!(patch.validation_error, Patch::Set(_)));
    }

    #[test]
    /// The router only ever answers from its declared outputs.
    fn test_validation_router() {
        let router = route_validation();
        let mut state = SessionState::default();
        assert_eq!(router.decide(&state), "invalid");
        state.is_valid = Some(true);
        assert_eq!(router.decide(&state), "valid");
    }
}
