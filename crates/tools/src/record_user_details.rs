//! `record_user_details` — pass a visitor's question and contact details on.

use async_trait::async_trait;
use standin_core::error::ToolError;
use standin_core::event::EventBus;
use standin_core::notify::NotificationSink;
use standin_core::tool::{ParamType, ParameterSpec, Tool, ToolName};
use std::sync::Arc;

const NAME_DEFAULT: &str = "name not provided";
const NOTES_DEFAULT: &str = "none provided";

pub struct RecordUserDetailsTool {
    sink: Arc<dyn NotificationSink>,
    events: Option<Arc<EventBus>>,
}

impl RecordUserDetailsTool {
    pub fn new(sink: Arc<dyn NotificationSink>, events: Option<Arc<EventBus>>) -> Self {
        Self { sink, events }
    }
}

/// Optional text fields fall back to a placeholder when absent or blank.
fn text_or<'a>(arguments: &'a serde_json::Value, field: &str, default: &'a str) -> &'a str {
    arguments[field]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

pub(crate) fn format_notification(arguments: &serde_json::Value) -> String {
    let question = arguments["question"].as_str().unwrap_or_default();
    let email = arguments["email"].as_str().unwrap_or_default();
    let name = text_or(arguments, "name", NAME_DEFAULT);
    let notes = text_or(arguments, "notes", NOTES_DEFAULT);
    format!("Recording question \"{question}\" from {name} <{email}>. Notes: {notes}")
}

#[async_trait]
impl Tool for RecordUserDetailsTool {
    fn name(&self) -> ToolName {
        ToolName::RecordUserDetails
    }

    fn description(&self) -> &str {
        "Use this tool to record that a user is interested in being in touch and provided an \
         email address, together with the question they asked"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("email", ParamType::String, "The email address of this user"),
            ParameterSpec::required(
                "question",
                ParamType::String,
                "The question the user asked that could not be answered",
            ),
            ParameterSpec::optional("name", ParamType::String, "The user's name, if they provided it"),
            ParameterSpec::optional(
                "notes",
                ParamType::String,
                "Any additional information about the conversation that's worth recording to give context",
            ),
        ]
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let text = format_notification(&arguments);
        crate::push_notification(self.sink.as_ref(), self.events.as_deref(), &text).await;
        Ok(crate::recorded_ack())
    }
}
