//! Audit-log entry for an inbound notification.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, WebhookEventId};

use super::Notification;

/// One row per inbound notification, written before any side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: WebhookEventId,

    pub kind: Option<String>,

    pub action: Option<String>,

    /// Referenced payment id, if any.
    pub payment_id: Option<String>,

    pub raw_payload: serde_json::Value,

    pub processed: bool,

    pub processed_at: Option<Timestamp>,

    /// Why reconciliation did not complete, if it didn't.
    pub error: Option<String>,

    pub created_at: Timestamp,
}

impl WebhookEvent {
    /// Audit entry for a decoded notification.
    pub fn received(notification: &Notification, now: Timestamp) -> Self {
        Self {
            id: WebhookEventId::new(),
            kind: notification.kind.clone(),
            action: notification.action.clone(),
            payment_id: notification.resource_id.clone(),
            raw_payload: notification.raw.clone(),
            processed: false,
            processed_at: None,
            error: None,
            created_at: now,
        }
    }

    /// Audit entry for a body that could not be decoded.
    ///
    /// The body is kept as a JSON string so nothing is lost.
    pub fn undecodable(body: &[u8], now: Timestamp) -> Self {
        Self {
            id: WebhookEventId::new(),
            kind: None,
            action: None,
            payment_id: None,
            raw_payload: serde_json::Value::String(String::from_utf8_lossy(body).into_owned()),
            processed: false,
            processed_at: None,
            error: None,
            created_at: now,
        }
    }

    pub fn mark_processed(&mut self, at: Timestamp) {
        self.processed = true;
        self.processed_at = Some(at);
    }

    pub fn mark_errored(&mut self, detail: impl Into<String>) {
        self.error = Some(detail.into());
    }
}
