//! Telegram Bot API notifier.
//!
//! Pushes operator notifications with a single `sendMessage` call. Delivery
//! is best-effort: every failure is reported in the outcome and logged,
//! nothing is retried.

use async_trait::async_trait;
use standin_core::error::NotifyError;
use standin_core::notify::{NotificationSink, NotifyOutcome};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Telegram notifier configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot API base URL, without trailing slash.
    pub api_base: String,
    /// Bot token from @BotFather.
    pub bot_token: Option<String>,
    /// Destination chat.
    pub chat_id: Option<String>,
    /// Client timeout for one delivery.
    pub timeout: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_base", &self.api_base)
            .field(
                "bot_token",
                &self.bot_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl From<&standin_config::NotifierConfig> for TelegramConfig {
    fn from(config: &standin_config::NotifierConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl TelegramConfig {
    fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat_id = self.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat_id))
    }
}

/// Telegram notification sink.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { config, client }
    }

    async fn deliver(&self, token: &str, chat_id: &str, text: &str) -> Result<NotifyOutcome, NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.config.api_base, token);

        let response = self
            .client
            .get(&url)
            .query(&[("chat_id", chat_id), ("text", text)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    }
                } else {
                    NotifyError::Network(e.to_string())
                }
            })?;

        let status_code = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let outcome = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(body) if body["ok"] == serde_json::Value::Bool(true) => NotifyOutcome::ok(body),
            Ok(body) => NotifyOutcome::failed(body),
            Err(_) => {
                debug!(status_code, "Non-JSON reply from Bot API");
                NotifyOutcome::failed(serde_json::json!({
                    "ok": false,
                    "status_code": status_code,
                    "text": text,
                }))
            }
        };
        Ok(outcome)
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, text: &str) -> NotifyOutcome {
        let Some((token, chat_id)) = self.config.credentials() else {
            warn!("Telegram notifier has no credentials, skipping delivery");
            return NotifyError::NotConfigured("missing BOT_TOKEN or CHAT_ID".into()).into();
        };

        let outcome = match self.deliver(token, chat_id, text).await {
            Ok(outcome) => outcome,
            Err(e) => e.into(),
        };

        if outcome.is_ok() {
            info!(chat_id = %chat_id, text_len = text.len(), "Notification delivered");
        } else {
            warn!(chat_id = %chat_id, detail = %outcome.detail, "Notification not delivered");
        }
        outcome
    }
}
