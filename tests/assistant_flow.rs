//! End-to-end runs of the bundled assistant graph: suspension, resume,
//! the feedback cycle, and failure recovery.

mod common;

use std::sync::Arc;

use common::{
    AcceptAllValidator, RejectAllValidator, ScriptedModel, canned_tools, weather_call,
    wikipedia_call,
};
use stateloom::assistant::{self, AssistantConfig, build_feedback_graph};
use stateloom::checkpoint::{Checkpointer, Cursor, InMemoryCheckpointer};
use stateloom::collaborators::QueryValidator;
use stateloom::engine::{Engine, RunStatus};
use stateloom::graph::StepId;
use stateloom::message::{Message, ToolCall};
use stateloom::state::{Patch, StatePatch};

fn build_engine(
    model: Arc<ScriptedModel>,
    validator: impl QueryValidator + 'static,
) -> (Engine, Arc<InMemoryCheckpointer>) {
    let graph = build_feedback_graph(AssistantConfig {
        decision: model,
        validator: Arc::new(validator),
        tools: canned_tools(),
    })
    .expect("assistant graph should compile");
    let store = Arc::new(InMemoryCheckpointer::new());
    let engine = Engine::new(graph, store.clone() as Arc<dyn Checkpointer>);
    (engine, store)
}

fn seed(query: &str) -> StatePatch {
    StatePatch::new().append_messages(vec![Message::user(query)])
}

/// Resume input the way a caller supplies it: the feedback text both as a
/// user message and as the `user_feedback` flag.
fn feedback(text: &str) -> StatePatch {
    StatePatch::new()
        .append_messages(vec![Message::user(text)])
        .with_user_feedback(Patch::Set(text.to_string()))
}

#[tokio::test]
async fn happy_path_suspends_with_checkpoint_then_completes() {
    let model = ScriptedModel::new(vec![
        Message::assistant_with_tool_calls("", vec![weather_call("c1", "Accra")]),
        Message::assistant("It is 22C and sunny in Accra."),
    ]);
    let (engine, store) = build_engine(model.clone(), AcceptAllValidator);

    let outcome = engine.run("s1", seed("weather in Accra?")).await.unwrap();
    assert_eq!(
        outcome.status,
        RunStatus::Suspended {
            at: StepId::from(assistant::AWAIT_FEEDBACK)
        }
    );
    assert_eq!(
        outcome.state.final_answer.as_deref(),
        Some("It is 22C and sunny in Accra.")
    );
    assert!(outcome.state.messages.is_empty());
    assert_eq!(outcome.state.tools_used, vec!["weather"]);

    let checkpoint = store.load("s1").await.unwrap().expect("checkpoint written");
    assert_eq!(
        checkpoint.cursor,
        Cursor::RouteFrom(StepId::from(assistant::AWAIT_FEEDBACK))
    );
    assert_eq!(checkpoint.state, outcome.state);

    // Resuming without feedback routes to END and removes the checkpoint.
    let resumed = engine.run("s1", StatePatch::new()).await.unwrap();
    assert!(resumed.is_completed());
    assert_eq!(
        resumed.state.final_answer.as_deref(),
        Some("It is 22C and sunny in Accra.")
    );
    assert!(store.load("s1").await.unwrap().is_none());

    // Resume routed; it did not re-execute any model-backed step.
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn invalid_query_completes_without_checkpoint() {
    let model = ScriptedModel::new(vec![]);
    let (engine, store) = build_engine(model.clone(), RejectAllValidator);

    let outcome = engine.run("s1", seed("asdfgh")).await.unwrap();
    assert!(outcome.is_completed());
    assert_eq!(outcome.state.is_valid, Some(false));
    assert!(outcome.state.validation_error.is_some());
    assert!(outcome.state.final_answer.is_none());
    assert!(store.load("s1").await.unwrap().is_none());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn feedback_cycle_revises_answer_and_keeps_original_response() {
    let model = ScriptedModel::new(vec![
        Message::assistant_with_tool_calls("", vec![weather_call("c1", "Accra")]),
        Message::assistant("Sunny in Accra."),
        // Revision pass: decision then finalize, no tools this time.
        Message::assistant("Sunny, about 22C."),
        Message::assistant("Sunny and 22C in Accra."),
    ]);
    let (engine, store) = build_engine(model.clone(), AcceptAllValidator);

    let first = engine.run("s1", seed("weather in Accra?")).await.unwrap();
    assert!(first.is_suspended());
    assert_eq!(first.state.original_response.as_deref(), Some("Sunny in Accra."));

    let revised = engine
        .run("s1", feedback("mention the temperature"))
        .await
        .unwrap();
    assert!(revised.is_suspended());
    assert_eq!(
        revised.state.final_answer.as_deref(),
        Some("Sunny and 22C in Accra.")
    );
    // The first answer stays on record across revisions.
    assert_eq!(
        revised.state.original_response.as_deref(),
        Some("Sunny in Accra.")
    );
    assert!(revised.state.user_feedback.is_none());

    let done = engine.run("s1", StatePatch::new()).await.unwrap();
    assert!(done.is_completed());
    assert_eq!(
        done.state.final_answer.as_deref(),
        Some("Sunny and 22C in Accra.")
    );
    assert_eq!(done.state.original_response.as_deref(), Some("Sunny in Accra."));
    assert!(store.load("s1").await.unwrap().is_none());
    assert_eq!(model.calls(), 4);
}

#[tokio::test]
async fn unknown_tool_in_batch_is_excluded_from_tools_used() {
    let calls = vec![
        weather_call("c1", "Accra"),
        wikipedia_call("c2", "Ghana"),
        ToolCall::new("c3", "horoscope", serde_json::Map::new()),
    ];
    let model = ScriptedModel::new(vec![
        Message::assistant_with_tool_calls("", calls),
        Message::assistant("Summary of Accra, Ghana, weather included."),
    ]);
    let (engine, store) = build_engine(model, AcceptAllValidator);

    let outcome = engine.run("s1", seed("tell me about Accra")).await.unwrap();
    assert!(outcome.is_suspended());
    // Both successes, in invocation order; the unknown tool is excluded.
    assert_eq!(outcome.state.tools_used, vec!["weather", "wikipedia"]);
    // The exclusion survives into the persisted state.
    let checkpoint = store.load("s1").await.unwrap().unwrap();
    assert_eq!(checkpoint.state.tools_used, vec!["weather", "wikipedia"]);
}

#[tokio::test]
async fn collaborator_failure_leaves_checkpoint_intact_and_retry_succeeds() {
    let model = ScriptedModel::new(vec![
        Message::assistant_with_tool_calls("", vec![weather_call("c1", "Accra")]),
        Message::assistant("Sunny in Accra."),
        // Script ends here: the revision pass will fail.
    ]);
    let (engine, store) = build_engine(model.clone(), AcceptAllValidator);

    let first = engine.run("s1", seed("weather in Accra?")).await.unwrap();
    assert!(first.is_suspended());
    let before = store.load("s1").await.unwrap().unwrap();

    let err = engine
        .run("s1", feedback("shorter please"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        stateloom::EngineError::Step { ref step, .. } if step.as_str() == assistant::DECISION
    ));
    // Failed run merged nothing durable: the checkpoint is exactly as before.
    let after = store.load("s1").await.unwrap().unwrap();
    assert_eq!(after.state, before.state);
    assert_eq!(after.cursor, before.cursor);

    // Refill the script and retry the same resume; it re-enters at the
    // persisted position and succeeds.
    model.push(Message::assistant("Sunny."));
    model.push(Message::assistant("Sunny."));
    let retried = engine.run("s1", feedback("shorter please")).await.unwrap();
    assert!(retried.is_suspended());
    assert_eq!(retried.state.final_answer.as_deref(), Some("Sunny."));
}

#[tokio::test]
async fn sessions_are_isolated() {
    let model = ScriptedModel::new(vec![
        Message::assistant("Answer for session one."),
        Message::assistant("Answer for session one."),
        Message::assistant("Answer for session two."),
        Message::assistant("Answer for session two."),
    ]);
    let (engine, store) = build_engine(model, AcceptAllValidator);

    let one = engine.run("s1", seed("first question")).await.unwrap();
    let two = engine.run("s2", seed("second question")).await.unwrap();
    assert_eq!(one.state.final_answer.as_deref(), Some("Answer for session one."));
    assert_eq!(two.state.final_answer.as_deref(), Some("Answer for session two."));

    let mut sessions = store.list_sessions().await.unwrap();
    sessions.sort();
    assert_eq!(sessions, vec!["s1", "s2"]);
}
