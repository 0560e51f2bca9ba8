//! Shared test helpers for loop tests.

use async_trait::async_trait;
use standin_core::error::{ProviderError, ToolError};
use standin_core::message::{Message, MessageToolCall};
use standin_core::notify::{NotificationSink, NotifyOutcome};
use standin_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use standin_core::tool::{ParamType, ParameterSpec, Tool, ToolName, ToolRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider that replays scripted responses and records every request.
///
/// Responses are returned in order; once only one is left it repeats
/// forever, which models a model that never stops asking for tools.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    error: Option<ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            error: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => panic!("ScriptedProvider: no responses scripted"),
            1 => Ok(responses[0].clone()),
            _ => Ok(responses.remove(0)),
        }
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional text.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, text: &str) -> ProviderResponse {
    let mut msg = Message::assistant(text);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A sink that counts notifications and always delivers.
#[derive(Default)]
pub struct CountingSink {
    sent: AtomicUsize,
}

impl CountingSink {
    pub fn count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    async fn notify(&self, _text: &str) -> NotifyOutcome {
        self.sent.fetch_add(1, Ordering::SeqCst);
        NotifyOutcome::ok(serde_json::json!({"ok": true}))
    }
}

/// The real contact tools, wired to `sink`.
pub fn registry_with_sink(sink: Arc<dyn NotificationSink>) -> Arc<ToolRegistry> {
    Arc::new(standin_tools::default_registry(sink, None).unwrap())
}

/// The real contact tools, wired to a sink nobody inspects.
pub fn contact_registry() -> Arc<ToolRegistry> {
    registry_with_sink(Arc::new(CountingSink::default()))
}

/// Sleeps for `delay_ms`, then records its `question` as finished.
struct DelayTool {
    name: ToolName,
    finished: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Tool for DelayTool {
    fn name(&self) -> ToolName {
        self.name
    }

    fn description(&self) -> &str {
        "Sleeps, then records completion"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("question", ParamType::String, "Completion tag"),
            ParameterSpec::optional("delay_ms", ParamType::Integer, "How long to sleep"),
        ]
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let delay = arguments["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let tag = arguments["question"].as_str().unwrap_or_default().to_string();
        self.finished.lock().unwrap().push(tag);
        Ok(serde_json::json!({"recorded": true}))
    }
}

/// A registry whose tools finish after a per-call delay, plus the log of
/// completion order.
pub fn delayed_registry() -> (Arc<ToolRegistry>, Arc<Mutex<Vec<String>>>) {
    let finished = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    for name in ToolName::ALL {
        registry
            .register(Box::new(DelayTool {
                name,
                finished: finished.clone(),
            }))
            .unwrap();
    }
    (Arc::new(registry), finished)
}
