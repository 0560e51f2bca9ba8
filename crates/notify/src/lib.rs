//! Notification sinks for Standin.
//!
//! All sinks implement the `standin_core::NotificationSink` trait.

pub mod telegram;

pub use telegram::{TelegramConfig, TelegramNotifier};

use async_trait::async_trait;
use standin_core::error::NotifyError;
use standin_core::notify::{NotificationSink, NotifyOutcome};
use std::sync::Arc;

/// A sink that reports every notification as not configured.
///
/// Used when `[notifier] enabled = false`.
pub struct DisabledNotifier;

#[async_trait]
impl NotificationSink for DisabledNotifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn notify(&self, text: &str) -> NotifyOutcome {
        tracing::debug!(text_len = text.len(), "Notifier disabled, dropping notification");
        NotifyError::NotConfigured("notifier disabled".into()).into()
    }
}

/// Build the sink described by the `[notifier]` config section.
pub fn build_from_config(config: &standin_config::NotifierConfig) -> Arc<dyn NotificationSink> {
    if !config.enabled {
        return Arc::new(DisabledNotifier);
    }
    Arc::new(TelegramNotifier::new(TelegramConfig::from(config)))
}
