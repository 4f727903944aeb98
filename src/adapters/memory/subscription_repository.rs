//! In-memory subscription ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::ports::SubscriptionRepository;

/// Subscriptions keyed by id. The write lock makes `update_if_status`
/// a true compare-and-swap.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    writes: Arc<RwLock<usize>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful conditional updates.
    pub async fn write_count(&self) -> usize {
        *self.writes.read().await
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.contains_key(&subscription.id) {
            return Err(DomainError::database(format!(
                "Subscription {} already exists",
                subscription.id
            )));
        }
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn update_if_status(
        &self,
        subscription: &Subscription,
        expected: SubscriptionStatus,
    ) -> Result<bool, DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions.get_mut(&subscription.id) {
            Some(stored) if stored.status == expected => {
                *stored = subscription.clone();
                *self.writes.write().await += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", subscription.id),
            )),
        }
    }

    async fn set_preference_id(
        &self,
        id: &SubscriptionId,
        preference_id: &str,
    ) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        let stored = subscriptions.get_mut(id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", id),
            )
        })?;
        stored.provider_preference_id = Some(preference_id.to_string());
        Ok(())
    }
}
