//! Contact-capture tools for Standin.
//!
//! Both tools hand a formatted line to the operator's notification sink and
//! acknowledge the model with `{"recorded": true}`, whatever the sink
//! reports. Delivery problems are logged and published on the event bus.

pub mod record_unknown_question;
pub mod record_user_details;

pub use record_unknown_question::RecordUnknownQuestionTool;
pub use record_user_details::RecordUserDetailsTool;

use standin_core::error::ToolError;
use standin_core::event::{DomainEvent, EventBus};
use standin_core::notify::NotificationSink;
use standin_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// The acknowledgement every recording tool returns.
pub fn recorded_ack() -> serde_json::Value {
    serde_json::json!({"recorded": true})
}

/// Send `text` to the sink and report what happened.
pub(crate) async fn push_notification(
    sink: &dyn NotificationSink,
    events: Option<&EventBus>,
    text: &str,
) {
    let outcome = sink.notify(text).await;
    if outcome.is_ok() {
        debug!(sink = sink.name(), "Operator notified");
    } else {
        warn!(sink = sink.name(), detail = %outcome.detail, "Operator notification failed");
    }

    if let Some(bus) = events {
        bus.publish(DomainEvent::NotificationAttempted {
            sink: sink.name().to_string(),
            delivered: outcome.is_ok(),
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Create a complete registry wired to `sink`.
pub fn default_registry(
    sink: Arc<dyn NotificationSink>,
    events: Option<Arc<EventBus>>,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(RecordUserDetailsTool::new(
        sink.clone(),
        events.clone(),
    )))?;
    registry.register(Box::new(RecordUnknownQuestionTool::new(sink, events)))?;
    registry.validate_complete()?;
    Ok(registry)
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use standin_core::notify::{NotificationSink, NotifyOutcome};
    use std::sync::Mutex;

    /// Remembers every text it is handed and answers with a fixed outcome.
    pub struct RecordingSink {
        pub sent: Mutex<Vec<String>>,
        pub deliver: bool,
    }

    impl RecordingSink {
        pub fn delivering() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                deliver: true,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                deliver: false,
            }
        }

        pub fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, text: &str) -> NotifyOutcome {
            self.sent.lock().unwrap().push(text.to_string());
            if self.deliver {
                NotifyOutcome::ok(serde_json::json!({"ok": true}))
            } else {
                NotifyOutcome::failed(serde_json::json!("Network error: connection refused"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::*;
    use standin_core::message::MessageToolCall;
    use standin_core::tool::{ToolName, ToolStatus};

    #[test]
    fn default_registry_is_complete() {
        let registry = default_registry(Arc::new(RecordingSink::delivering()), None).unwrap();
        assert_eq!(
            registry.names(),
            vec![ToolName::RecordUserDetails, ToolName::RecordUnknownQuestion]
        );
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "record_user_details");
        assert_eq!(defs[0].parameters["required"], serde_json::json!(["email", "question"]));
        assert_eq!(defs[1].parameters["required"], serde_json::json!(["question"]));
    }

    #[tokio::test]
    async fn failed_notification_still_acks_and_publishes() {
        let sink = Arc::new(RecordingSink::failing());
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let registry = default_registry(sink.clone(), Some(bus)).unwrap();

        let result = registry
            .dispatch(&MessageToolCall {
                id: "call_1".into(),
                name: "record_unknown_question".into(),
                arguments: r#"{"question":"Do you speak Japanese?"}"#.into(),
            })
            .await;

        assert_eq!(result.status, ToolStatus::Ok);
        assert_eq!(result.payload, recorded_ack());
        assert_eq!(sink.texts().len(), 1);

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::NotificationAttempted { sink, delivered, .. } => {
                assert_eq!(sink, "recording");
                assert!(!delivered);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn timed_out_notification_still_acks() {
        let app = axum::Router::new().fallback(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            axum::Json(serde_json::json!({"ok": true}))
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sink = Arc::new(standin_notify::TelegramNotifier::new(
            standin_notify::TelegramConfig {
                api_base: format!("http://{addr}"),
                bot_token: Some("123:abc".into()),
                chat_id: Some("42".into()),
                timeout: std::time::Duration::from_millis(200),
            },
        ));
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let registry = default_registry(sink, Some(bus)).unwrap();

        let result = registry
            .dispatch(&MessageToolCall {
                id: "call_1".into(),
                name: "record_user_details".into(),
                arguments: r#"{"email":"grace@example.com","question":"Q"}"#.into(),
            })
            .await;

        assert_eq!(result.status, ToolStatus::Ok);
        assert_eq!(result.payload, recorded_ack());
        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::NotificationAttempted { sink, delivered, .. } => {
                assert_eq!(sink, "telegram");
                assert!(!delivered);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_required_field_never_reaches_sink() {
        let sink = Arc::new(RecordingSink::delivering());
        let registry = default_registry(sink.clone(), None).unwrap();

        let result = registry
            .dispatch(&MessageToolCall {
                id: "call_1".into(),
                name: "record_user_details".into(),
                arguments: r#"{"question":"Q"}"#.into(),
            })
            .await;

        assert_eq!(result.status, ToolStatus::Error);
        assert!(result.payload["error"].as_str().unwrap().starts_with("record_user_details:"));
        assert!(sink.texts().is_empty());
    }
}
