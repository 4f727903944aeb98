//! SubscriptionRepository port - Persistence for the subscription ledger.

use async_trait::async_trait;

use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, SubscriptionId};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Inserts a new subscription.
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Writes `subscription` only if the stored status is still `expected`.
    ///
    /// Returns `false` when another writer got there first; the caller
    /// should re-read and decide again.
    async fn update_if_status(
        &self,
        subscription: &Subscription,
        expected: SubscriptionStatus,
    ) -> Result<bool, DomainError>;

    /// Stores the checkout preference id.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionNotFound` if no row matches.
    async fn set_preference_id(
        &self,
        id: &SubscriptionId,
        preference_id: &str,
    ) -> Result<(), DomainError>;
}
