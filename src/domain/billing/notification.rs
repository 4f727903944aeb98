//! Inbound payment notifications.
//!
//! Notifications are untrusted: they only tell us *which* payment to look
//! at. Status is always fetched from the provider.

use serde::Deserialize;
use thiserror::Error;

/// Notification type that refers to a payment.
pub const PAYMENT_TOPIC: &str = "payment";

/// A decoded notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Notification type (`payment`, `merchant_order`, ...).
    pub kind: Option<String>,

    pub action: Option<String>,

    /// Referenced resource id, normalized to a string.
    pub resource_id: Option<String>,

    /// Full payload as received.
    pub raw: serde_json::Value,
}

/// The body could not be read as a notification.
#[derive(Debug, Error)]
#[error("malformed payload: {0}")]
pub struct MalformedNotification(#[from] serde_json::Error);

#[derive(Debug, Deserialize)]
struct NotificationBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    action: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// `data.id` arrives as either a string or an integer. Any other shape
/// (float, object, array, `data` not an object) carries no resource id.
fn resource_id(data: &serde_json::Value) -> Option<String> {
    match data.get("id")? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

impl Notification {
    /// Decodes a JSON body.
    ///
    /// Unknown fields are ignored; a body that is valid JSON but carries
    /// none of the expected fields still decodes, with every field empty.
    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedNotification> {
        let raw: serde_json::Value = serde_json::from_slice(body)?;
        let parsed: NotificationBody = serde_json::from_value(raw.clone())?;

        Ok(Self {
            kind: parsed.kind,
            action: parsed.action,
            resource_id: resource_id(&parsed.data),
            raw,
        })
    }

    /// Payment id to reconcile, present only for payment notifications.
    pub fn payment_id(&self) -> Option<&str> {
        match self.kind.as_deref() {
            Some(PAYMENT_TOPIC) => self.resource_id.as_deref(),
            _ => None,
        }
    }
}
