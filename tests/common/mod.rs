//! Shared fixtures for integration tests: scripted collaborators and canned
//! tools shaped like the real ones a deployment would plug in.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use stateloom::collaborators::{
    CollaboratorError, DecisionModel, QueryFacets, QueryValidator,
};
use stateloom::message::{Message, ToolCall};
use stateloom::tools::{Tool, ToolError, ToolRegistry};

/// Decision model that replays a fixed script of responses.
///
/// Exhausting the script yields a collaborator error, which doubles as the
/// failure-injection fixture.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Message>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// A model whose very first call fails.
    pub fn failing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// How many times the model has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Appends a response to the end of the script.
    pub fn push(&self, response: Message) {
        self.responses.lock().push_back(response);
    }
}

#[async_trait]
impl DecisionModel for ScriptedModel {
    async fn invoke(&self, _messages: &[Message]) -> Result<Message, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| CollaboratorError::call_failed("scripted-model", "script exhausted"))
    }
}

/// Validator that accepts every query.
pub struct AcceptAllValidator;

#[async_trait]
impl QueryValidator for AcceptAllValidator {
    async fn invoke(&self, _message: &Message) -> Result<QueryFacets, CollaboratorError> {
        Ok(QueryFacets::new("Accra", "weather"))
    }
}

/// Validator that rejects every query.
pub struct RejectAllValidator;

#[async_trait]
impl QueryValidator for RejectAllValidator {
    async fn invoke(&self, _message: &Message) -> Result<QueryFacets, CollaboratorError> {
        Ok(QueryFacets::invalid())
    }
}

/// Canned weather lookup.
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        let city = arguments
            .get("city")
            .and_then(Value::as_str)
            .unwrap_or("Accra");
        Ok(format!("22C and sunny in {city}"))
    }
}

/// Canned encyclopedia lookup.
pub struct WikipediaTool;

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        let topic = arguments
            .get("topic")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'topic'".to_string()))?;
        Ok(format!("{topic}: summary from the encyclopedia"))
    }
}

/// Canned headline lookup.
pub struct NewsTool;

#[async_trait]
impl Tool for NewsTool {
    fn name(&self) -> &str {
        "news"
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or("top stories");
        Ok(format!("Headlines about {query}"))
    }
}

/// Registry holding all three canned tools.
pub fn canned_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(WeatherTool)
        .with_tool(WikipediaTool)
        .with_tool(NewsTool)
}

pub fn weather_call(id: &str, city: &str) -> ToolCall {
    let mut args = Map::new();
    args.insert("city".to_string(), json!(city));
    ToolCall::new(id, "weather", args)
}

pub fn wikipedia_call(id: &str, topic: &str) -> ToolCall {
    let mut args = Map::new();
    args.insert("topic".to_string(), json!(topic));
    ToolCall::new(id, "wikipedia", args)
}
