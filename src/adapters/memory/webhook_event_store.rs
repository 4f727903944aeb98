//! In-memory audit log.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::WebhookEvent;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, WebhookEventId};
use crate::ports::WebhookEventStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookEventStore {
    events: Arc<RwLock<Vec<WebhookEvent>>>,
    fail_appends: Arc<AtomicBool>,
}

impl InMemoryWebhookEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `append` fail (simulates an unavailable store).
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// All events in insertion order.
    pub async fn all(&self) -> Vec<WebhookEvent> {
        self.events.read().await.clone()
    }

    async fn update<F>(&self, id: &WebhookEventId, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut WebhookEvent),
    {
        let mut events = self.events.write().await;
        let event = events.iter_mut().find(|e| &e.id == id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::WebhookEventNotFound,
                format!("Webhook event not found: {}", id),
            )
        })?;
        f(event);
        Ok(())
    }
}

#[async_trait]
impl WebhookEventStore for InMemoryWebhookEventStore {
    async fn append(&self, event: &WebhookEvent) -> Result<WebhookEventId, DomainError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(DomainError::database("audit log unavailable"));
        }
        self.events.write().await.push(event.clone());
        Ok(event.id)
    }

    async fn mark_processed(&self, id: &WebhookEventId, at: Timestamp) -> Result<(), DomainError> {
        self.update(id, |e| e.mark_processed(at)).await
    }

    async fn mark_errored(&self, id: &WebhookEventId, detail: &str) -> Result<(), DomainError> {
        self.update(id, |e| e.mark_errored(detail)).await
    }

    async fn find(&self, id: &WebhookEventId) -> Result<Option<WebhookEvent>, DomainError> {
        Ok(self.events.read().await.iter().find(|e| &e.id == id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<WebhookEvent>, DomainError> {
        Ok(self
            .events
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
