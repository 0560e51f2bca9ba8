//! `record_unknown_question` — log a question that could not be answered.

use async_trait::async_trait;
use standin_core::error::ToolError;
use standin_core::event::EventBus;
use standin_core::notify::NotificationSink;
use standin_core::tool::{ParamType, ParameterSpec, Tool, ToolName};
use std::sync::Arc;

pub struct RecordUnknownQuestionTool {
    sink: Arc<dyn NotificationSink>,
    events: Option<Arc<EventBus>>,
}

impl RecordUnknownQuestionTool {
    pub fn new(sink: Arc<dyn NotificationSink>, events: Option<Arc<EventBus>>) -> Self {
        Self { sink, events }
    }
}

#[async_trait]
impl Tool for RecordUnknownQuestionTool {
    fn name(&self) -> ToolName {
        ToolName::RecordUnknownQuestion
    }

    fn description(&self) -> &str {
        "Only use this tool if the user declined to share their contact details. It records \
         just the question that couldn't be answered"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "question",
            ParamType::String,
            "The question that couldn't be answered",
        )]
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let question = arguments["question"].as_str().unwrap_or_default();
        let text = format!("Recording unanswered question: {question}");
        crate::push_notification(self.sink.as_ref(), self.events.as_deref(), &text).await;
        Ok(crate::recorded_ack())
    }
}
