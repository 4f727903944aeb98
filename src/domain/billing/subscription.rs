//! Subscription aggregate.
//!
//! A subscription is created `pending` by the checkout flow and from then on
//! only changes through reconciliation of a provider payment.
//!
//! # Design Decisions
//!
//! - **Money in cents**: price stored as i64 cents
//! - **Never deleted**: cancelled subscriptions stay in the ledger
//! - **Plan owns the period**: period length comes from the stored plan,
//!   never from the payment

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

use super::{Plan, SubscriptionStatus};

/// Subscription aggregate - a user's premium plan purchase.
///
/// # Invariants
///
/// - `starts_at`, `ends_at` and `next_billing_at` are set together on activation
/// - `ends_at == next_billing_at` right after activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier, also the provider's external reference.
    pub id: SubscriptionId,

    /// User who bought the subscription.
    pub user_id: UserId,

    pub plan: Plan,

    pub status: SubscriptionStatus,

    /// Price at creation time, in cents.
    pub price_cents: i64,

    /// Start of the paid period.
    pub starts_at: Option<Timestamp>,

    /// End of the paid period.
    pub ends_at: Option<Timestamp>,

    pub next_billing_at: Option<Timestamp>,

    /// Checkout preference created for this subscription.
    pub provider_preference_id: Option<String>,

    /// Provider payment that activated this subscription.
    pub provider_payment_id: Option<String>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a subscription awaiting its first payment.
    pub fn create_pending(user_id: UserId, plan: Plan, now: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan,
            status: SubscriptionStatus::Pending,
            price_cents: plan.price_cents(),
            starts_at: None,
            ends_at: None,
            next_billing_at: None,
            provider_preference_id: None,
            provider_payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Activates the subscription for one period of its plan starting `now`.
    pub fn activate(&mut self, payment_id: impl Into<String>, now: Timestamp) {
        let end = self.plan.period_end(now);
        self.status = SubscriptionStatus::Active;
        self.starts_at = Some(now);
        self.ends_at = Some(end);
        self.next_billing_at = Some(end);
        self.provider_payment_id = Some(payment_id.into());
        self.updated_at = now;
    }

    /// Cancels the subscription. Period dates are kept for history.
    pub fn cancel(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::Cancelled;
        self.updated_at = now;
    }

    /// Moves the subscription back to pending while a payment is processed.
    pub fn mark_pending(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::Pending;
        self.updated_at = now;
    }

    pub fn is_active(&self) -> bool {
        self.status.has_access()
    }
}
