//! Notification side channel — best-effort delivery to an operator.
//!
//! A [`NotificationSink`] never fails from its caller's point of view:
//! missing credentials, network trouble and rejected deliveries all come
//! back as a [`NotifyOutcome`] with `status = error`. Delivery is
//! at-most-once; there is no retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Delivery status of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyStatus {
    Ok,
    Error,
}

/// What happened to one notification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyOutcome {
    pub status: NotifyStatus,
    pub detail: serde_json::Value,
}

impl NotifyOutcome {
    pub fn ok(detail: serde_json::Value) -> Self {
        Self {
            status: NotifyStatus::Ok,
            detail,
        }
    }

    pub fn failed(detail: serde_json::Value) -> Self {
        Self {
            status: NotifyStatus::Error,
            detail,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == NotifyStatus::Ok
    }
}

impl From<NotifyError> for NotifyOutcome {
    fn from(err: NotifyError) -> Self {
        Self::failed(serde_json::Value::String(err.to_string()))
    }
}

/// An external channel that operator notifications are pushed to.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// A short name for logs (e.g., "telegram").
    fn name(&self) -> &str;

    /// Attempt to deliver `text`. Must not panic and has no error path.
    async fn notify(&self, text: &str) -> NotifyOutcome;
}
