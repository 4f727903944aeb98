//! ReconcileNotificationHandler - Reconciles one inbound payment notification.
//!
//! Sequence per notification:
//!
//! 1. Audit-log the notification (best-effort)
//! 2. Fetch the payment from the provider (bounded)
//! 3. Append a payment history entry
//! 4. Resolve the subscription from the external reference
//! 5. Apply the transition policy with a conditional update
//! 6. On activation, grant premium on the user's profile
//! 7. Record the outcome on the audit row
//!
//! The handler never returns an error; every failure ends up on the audit
//! row and in the returned `ReconcileOutcome`.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{
    decide, Notification, PaymentDetails, PaymentRecord, ReconciliationError, Subscription,
    SubscriptionStatus, Transition, WebhookEvent,
};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId, WebhookEventId};
use crate::ports::{
    PaymentRecordRepository, PaymentStatusFetcher, ProfileWriter, SubscriptionRepository,
    WebhookEventStore,
};

/// Command carrying a raw notification body.
#[derive(Debug, Clone)]
pub struct ReconcileNotificationCommand {
    pub body: Vec<u8>,
}

/// Result of reconciling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Subscription entered `active`.
    Activated {
        subscription_id: SubscriptionId,
        user_id: UserId,
        /// Set when the profile could not be updated.
        profile_error: Option<String>,
    },
    /// Subscription entered `cancelled`.
    Cancelled { subscription_id: SubscriptionId },
    /// Subscription entered `pending`.
    MarkedPending { subscription_id: SubscriptionId },
    /// Subscription already reflected the payment.
    Unchanged {
        subscription_id: SubscriptionId,
        status: SubscriptionStatus,
    },
    /// Payment status has no rule; subscription untouched.
    UnhandledStatus {
        subscription_id: SubscriptionId,
        status: String,
    },
    /// Not a payment notification, or no payment id.
    Ignored,
    /// Body could not be decoded.
    Malformed,
    /// Provider does not know the payment.
    PaymentNotFound { payment_id: String },
    /// Reconciliation did not complete.
    Failed(ReconciliationError),
}

/// Limits applied by the handler.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
    /// Upper bound on one provider fetch.
    pub fetch_timeout: Duration,
    /// Conditional-update attempts per notification.
    pub max_update_attempts: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(5000),
            max_update_attempts: 3,
        }
    }
}

/// Handler for inbound payment notifications.
pub struct ReconcileNotificationHandler {
    events: Arc<dyn WebhookEventStore>,
    fetcher: Arc<dyn PaymentStatusFetcher>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRecordRepository>,
    profiles: Arc<dyn ProfileWriter>,
    settings: ReconcileSettings,
}

impl ReconcileNotificationHandler {
    pub fn new(
        events: Arc<dyn WebhookEventStore>,
        fetcher: Arc<dyn PaymentStatusFetcher>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        payments: Arc<dyn PaymentRecordRepository>,
        profiles: Arc<dyn ProfileWriter>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            events,
            fetcher,
            subscriptions,
            payments,
            profiles,
            settings,
        }
    }

    pub async fn handle(&self, cmd: ReconcileNotificationCommand) -> ReconcileOutcome {
        let notification = match Notification::from_slice(&cmd.body) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable notification body");
                let event_id = self
                    .append_event(&WebhookEvent::undecodable(&cmd.body, Timestamp::now()))
                    .await;
                self.mark_errored(event_id, &e.to_string()).await;
                return ReconcileOutcome::Malformed;
            }
        };

        tracing::info!(
            kind = ?notification.kind,
            action = ?notification.action,
            resource_id = ?notification.resource_id,
            "Notification received"
        );

        let event_id = self
            .append_event(&WebhookEvent::received(&notification, Timestamp::now()))
            .await;

        let Some(payment_id) = notification.payment_id() else {
            self.mark_processed(event_id).await;
            return ReconcileOutcome::Ignored;
        };

        match self.reconcile_payment(payment_id).await {
            Ok(outcome) => {
                self.mark_processed(event_id).await;
                if let ReconcileOutcome::Activated {
                    profile_error: Some(detail),
                    ..
                } = &outcome
                {
                    self.mark_errored(event_id, detail).await;
                }
                outcome
            }
            Err(e) if e.is_benign() => {
                tracing::info!(payment_id = %payment_id, "Payment not found at provider");
                self.mark_processed(event_id).await;
                ReconcileOutcome::PaymentNotFound {
                    payment_id: payment_id.to_string(),
                }
            }
            Err(e) => {
                if e.is_recoverable() {
                    tracing::warn!(payment_id = %payment_id, error = %e, "Reconciliation failed; awaiting redelivery");
                } else {
                    tracing::error!(payment_id = %payment_id, error = %e, "Reconciliation failed");
                }
                self.mark_errored(event_id, &e.to_string()).await;
                ReconcileOutcome::Failed(e)
            }
        }
    }

    async fn reconcile_payment(
        &self,
        payment_id: &str,
    ) -> Result<ReconcileOutcome, ReconciliationError> {
        let details = self.fetch(payment_id).await?;

        tracing::info!(
            payment_id = %details.payment_id,
            status = %details.status,
            external_reference = ?details.external_reference,
            "Payment fetched"
        );

        self.payments
            .append(&PaymentRecord::observed(&details, Timestamp::now()))
            .await?;

        let subscription_id =
            details
                .subscription_id()
                .ok_or_else(|| ReconciliationError::OrphanPayment {
                    payment_id: details.payment_id.clone(),
                    reference: details.external_reference.clone(),
                })?;

        let applied = match self.apply_transition(subscription_id, &details).await? {
            Applied::Written(subscription) => subscription,
            Applied::Skipped(outcome) => return Ok(outcome),
        };

        Ok(match applied.status {
            SubscriptionStatus::Active => {
                tracing::info!(
                    subscription_id = %applied.id,
                    payment_id = %details.payment_id,
                    plan = %applied.plan,
                    "Subscription activated"
                );
                let profile_error = self.grant_premium(&applied).await;
                ReconcileOutcome::Activated {
                    subscription_id: applied.id,
                    user_id: applied.user_id,
                    profile_error,
                }
            }
            SubscriptionStatus::Cancelled => {
                tracing::info!(subscription_id = %applied.id, payment_id = %details.payment_id, "Subscription cancelled");
                ReconcileOutcome::Cancelled {
                    subscription_id: applied.id,
                }
            }
            SubscriptionStatus::Pending => {
                tracing::info!(subscription_id = %applied.id, payment_id = %details.payment_id, "Subscription pending");
                ReconcileOutcome::MarkedPending {
                    subscription_id: applied.id,
                }
            }
        })
    }

    async fn fetch(&self, payment_id: &str) -> Result<PaymentDetails, ReconciliationError> {
        match tokio::time::timeout(self.settings.fetch_timeout, self.fetcher.fetch(payment_id))
            .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(ReconciliationError::TransientProvider(format!(
                "timed out after {}ms fetching payment {}",
                self.settings.fetch_timeout.as_millis(),
                payment_id
            ))),
        }
    }

    /// Decide-and-write loop. A lost compare-and-swap means another
    /// notification changed the subscription; re-read and decide again.
    async fn apply_transition(
        &self,
        subscription_id: SubscriptionId,
        details: &PaymentDetails,
    ) -> Result<Applied, ReconciliationError> {
        for attempt in 1..=self.settings.max_update_attempts {
            let current = self
                .subscriptions
                .find_by_id(&subscription_id)
                .await?
                .ok_or_else(|| ReconciliationError::OrphanPayment {
                    payment_id: details.payment_id.clone(),
                    reference: details.external_reference.clone(),
                })?;

            match decide(&current, details, Timestamp::now()) {
                Transition::Unhandled(status) => {
                    tracing::warn!(
                        subscription_id = %subscription_id,
                        payment_id = %details.payment_id,
                        status = %status,
                        "Unhandled payment status; subscription left unchanged"
                    );
                    return Ok(Applied::Skipped(ReconcileOutcome::UnhandledStatus {
                        subscription_id,
                        status,
                    }));
                }
                Transition::Unchanged(status) => {
                    tracing::debug!(
                        subscription_id = %subscription_id,
                        status = %status,
                        "Subscription already reflects payment"
                    );
                    return Ok(Applied::Skipped(ReconcileOutcome::Unchanged {
                        subscription_id,
                        status,
                    }));
                }
                Transition::Apply { from, updated } => {
                    if self.subscriptions.update_if_status(&updated, from).await? {
                        return Ok(Applied::Written(updated));
                    }
                    tracing::debug!(
                        subscription_id = %subscription_id,
                        attempt,
                        "Subscription changed concurrently; re-reading"
                    );
                }
            }
        }

        Err(ReconciliationError::ConcurrentModification(subscription_id))
    }

    /// Returns the failure detail when the profile could not be updated.
    async fn grant_premium(&self, subscription: &Subscription) -> Option<String> {
        match self
            .profiles
            .grant_premium(&subscription.user_id, subscription.plan)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    subscription_id = %subscription.id,
                    user_id = %subscription.user_id,
                    error = %e,
                    "Entitlement gap: subscription active but profile not updated"
                );
                Some(format!("entitlement gap: profile not updated: {}", e))
            }
        }
    }

    async fn append_event(&self, event: &WebhookEvent) -> Option<WebhookEventId> {
        match self.events.append(event).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(error = %e, payload = %event.raw_payload, "Failed to audit-log notification");
                None
            }
        }
    }

    async fn mark_processed(&self, event_id: Option<WebhookEventId>) {
        let Some(id) = event_id else { return };
        if let Err(e) = self.events.mark_processed(&id, Timestamp::now()).await {
            tracing::warn!(webhook_event_id = %id, error = %e, "Failed to mark notification processed");
        }
    }

    async fn mark_errored(&self, event_id: Option<WebhookEventId>, detail: &str) {
        let Some(id) = event_id else { return };
        if let Err(e) = self.events.mark_errored(&id, detail).await {
            tracing::warn!(webhook_event_id = %id, error = %e, "Failed to record notification error");
        }
    }
}

enum Applied {
    Written(Subscription),
    Skipped(ReconcileOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mercadopago::MockMercadoPago;
    use crate::adapters::memory::{
        InMemoryPaymentRecordRepository, InMemoryProfileWriter, InMemorySubscriptionRepository,
        InMemoryWebhookEventStore,
    };
    use crate::domain::billing::payment::test_support::payment;
    use crate::domain::billing::{PaymentFetchError, Plan, ProviderPaymentStatus};
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        events: InMemoryWebhookEventStore,
        provider: MockMercadoPago,
        subscriptions: InMemorySubscriptionRepository,
        payments: InMemoryPaymentRecordRepository,
        profiles: InMemoryProfileWriter,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                events: InMemoryWebhookEventStore::new(),
                provider: MockMercadoPago::new(),
                subscriptions: InMemorySubscriptionRepository::new(),
                payments: InMemoryPaymentRecordRepository::new(),
                profiles: InMemoryProfileWriter::new(),
            }
        }

        fn handler(&self) -> ReconcileNotificationHandler {
            self.handler_with(Arc::new(self.subscriptions.clone()), ReconcileSettings::default())
        }

        fn handler_with(
            &self,
            subscriptions: Arc<dyn SubscriptionRepository>,
            settings: ReconcileSettings,
        ) -> ReconcileNotificationHandler {
            ReconcileNotificationHandler::new(
                Arc::new(self.events.clone()),
                Arc::new(self.provider.clone()),
                subscriptions,
                Arc::new(self.payments.clone()),
                Arc::new(self.profiles.clone()),
                settings,
            )
        }

        async fn pending_subscription(&self, plan: Plan) -> Subscription {
            let user = UserId::new(uuid::Uuid::new_v4().to_string()).unwrap();
            self.profiles.add_profile(user.clone()).await;
            let sub = Subscription::create_pending(user, plan, Timestamp::now());
            self.subscriptions.insert(&sub).await.unwrap();
            sub
        }

        fn provider_says(&self, payment_id: &str, status: ProviderPaymentStatus, sub: &Subscription) {
            self.provider
                .set_payment(payment(payment_id, status, Some(sub.id.to_string())));
        }

        async fn stored(&self, sub: &Subscription) -> Subscription {
            self.subscriptions.find_by_id(&sub.id).await.unwrap().unwrap()
        }
    }

    fn payment_notification(payment_id: &str) -> ReconcileNotificationCommand {
        ReconcileNotificationCommand {
            body: format!(
                r#"{{"type":"payment","action":"payment.updated","data":{{"id":"{}"}}}}"#,
                payment_id
            )
            .into_bytes(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transitions
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn approved_payment_activates_subscription_and_profile() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);

        let before = Timestamp::now();
        let outcome = f.handler().handle(payment_notification("P1")).await;

        assert_eq!(
            outcome,
            ReconcileOutcome::Activated {
                subscription_id: sub.id,
                user_id: sub.user_id.clone(),
                profile_error: None,
            }
        );

        let stored = f.stored(&sub).await;
        assert_eq!(stored.status, SubscriptionStatus::Active);
        let starts_at = stored.starts_at.unwrap();
        assert!(!starts_at.is_before(&before));
        assert_eq!(stored.ends_at, Some(starts_at.add_months(1)));
        assert_eq!(stored.next_billing_at, stored.ends_at);
        assert_eq!(stored.provider_payment_id.as_deref(), Some("P1"));

        let profile = f.profiles.get(&sub.user_id).await.unwrap();
        assert!(profile.premium);
        assert_eq!(profile.plan, Some(Plan::Monthly));

        let events = f.events.all().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].processed);
        assert!(events[0].error.is_none());
        assert_eq!(f.payments.all().await.len(), 1);
    }

    #[tokio::test]
    async fn replayed_approval_is_a_no_op() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Yearly).await;
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);
        let handler = f.handler();

        handler.handle(payment_notification("P1")).await;
        let first = f.stored(&sub).await;
        let outcome = handler.handle(payment_notification("P1")).await;

        assert_eq!(
            outcome,
            ReconcileOutcome::Unchanged {
                subscription_id: sub.id,
                status: SubscriptionStatus::Active,
            }
        );
        assert_eq!(f.stored(&sub).await, first);
        assert_eq!(f.subscriptions.write_count().await, 1);
        assert_eq!(f.profiles.grants().await.len(), 1);
        assert_eq!(f.payments.all().await.len(), 2);
        assert!(f.events.all().await.iter().all(|e| e.processed));
    }

    #[tokio::test]
    async fn rejected_payment_cancels_pending_subscription() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P4", ProviderPaymentStatus::Rejected, &sub);

        let outcome = f.handler().handle(payment_notification("P4")).await;

        assert_eq!(outcome, ReconcileOutcome::Cancelled { subscription_id: sub.id });
        assert_eq!(f.stored(&sub).await.status, SubscriptionStatus::Cancelled);
        assert!(f.profiles.grants().await.is_empty());
    }

    #[tokio::test]
    async fn rejected_payment_on_cancelled_subscription_writes_nothing() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P4", ProviderPaymentStatus::Cancelled, &sub);
        let handler = f.handler();
        handler.handle(payment_notification("P4")).await;

        f.provider_says("P4", ProviderPaymentStatus::Rejected, &sub);
        let outcome = handler.handle(payment_notification("P4")).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Unchanged {
                status: SubscriptionStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(f.subscriptions.write_count().await, 1);
    }

    #[tokio::test]
    async fn in_process_payment_keeps_pending_subscription_unchanged() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P5", ProviderPaymentStatus::InProcess, &sub);

        let outcome = f.handler().handle(payment_notification("P5")).await;

        assert!(matches!(outcome, ReconcileOutcome::Unchanged { .. }));
        assert_eq!(f.subscriptions.write_count().await, 0);
    }

    #[tokio::test]
    async fn unrecognized_status_leaves_subscription_untouched() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P6", ProviderPaymentStatus::Unrecognized("refunded".into()), &sub);

        let outcome = f.handler().handle(payment_notification("P6")).await;

        assert_eq!(
            outcome,
            ReconcileOutcome::UnhandledStatus {
                subscription_id: sub.id,
                status: "refunded".into(),
            }
        );
        assert_eq!(f.stored(&sub).await, sub);
        assert!(f.events.all().await[0].processed);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Notifications that do not reach the ledger
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn notification_without_payment_id_is_processed_and_ignored() {
        let f = Fixture::new();
        let outcome = f
            .handler()
            .handle(ReconcileNotificationCommand {
                body: br#"{"type":"payment","data":null}"#.to_vec(),
            })
            .await;

        assert_eq!(outcome, ReconcileOutcome::Ignored);
        let events = f.events.all().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].processed);
        assert!(f.provider.fetched().is_empty());
    }

    #[tokio::test]
    async fn non_payment_topic_is_ignored() {
        let f = Fixture::new();
        let outcome = f
            .handler()
            .handle(ReconcileNotificationCommand {
                body: br#"{"type":"merchant_order","data":{"id":"77"}}"#.to_vec(),
            })
            .await;

        assert_eq!(outcome, ReconcileOutcome::Ignored);
        assert!(f.provider.fetched().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_logged_with_error() {
        let f = Fixture::new();
        let outcome = f
            .handler()
            .handle(ReconcileNotificationCommand {
                body: b"{not json".to_vec(),
            })
            .await;

        assert_eq!(outcome, ReconcileOutcome::Malformed);
        let events = f.events.all().await;
        assert_eq!(events.len(), 1);
        assert!(!events[0].processed);
        assert!(events[0].error.as_deref().unwrap().starts_with("malformed payload"));
        assert_eq!(events[0].raw_payload, serde_json::json!("{not json"));
    }

    #[tokio::test]
    async fn payment_unknown_to_provider_is_processed_without_side_effects() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;

        let outcome = f.handler().handle(payment_notification("P2")).await;

        assert_eq!(
            outcome,
            ReconcileOutcome::PaymentNotFound {
                payment_id: "P2".into()
            }
        );
        let events = f.events.all().await;
        assert!(events[0].processed);
        assert!(events[0].error.is_none());
        assert!(f.payments.all().await.is_empty());
        assert_eq!(f.stored(&sub).await, sub);
    }

    #[tokio::test]
    async fn orphan_payment_is_recorded_and_errored() {
        let f = Fixture::new();
        f.provider.set_payment(payment(
            "P7",
            ProviderPaymentStatus::Approved,
            Some(SubscriptionId::new().to_string()),
        ));

        let outcome = f.handler().handle(payment_notification("P7")).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Failed(ReconciliationError::OrphanPayment { .. })
        ));
        let events = f.events.all().await;
        assert!(!events[0].processed);
        assert!(events[0].error.as_deref().unwrap().starts_with("orphan payment P7"));
        assert_eq!(f.payments.all().await.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_reference_is_orphan() {
        let f = Fixture::new();
        f.provider.set_payment(payment(
            "P8",
            ProviderPaymentStatus::Approved,
            Some("pedido-123".into()),
        ));

        let outcome = f.handler().handle(payment_notification("P8")).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Failed(ReconciliationError::OrphanPayment { ref reference, .. })
                if reference.as_deref() == Some("pedido-123")
        ));
        let records = f.payments.all().await;
        assert_eq!(records[0].subscription_reference.as_deref(), Some("pedido-123"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Provider failures
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn transient_provider_error_marks_event_errored() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider
            .set_fetch_error("P3", PaymentFetchError::Transient("provider returned 503".into()));

        let outcome = f.handler().handle(payment_notification("P3")).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Failed(ReconciliationError::TransientProvider(_))
        ));
        let events = f.events.all().await;
        assert!(!events[0].processed);
        assert!(events[0].error.as_deref().unwrap().contains("503"));
        assert_eq!(f.stored(&sub).await, sub);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_as_transient() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P3", ProviderPaymentStatus::Approved, &sub);
        f.provider.set_latency(Duration::from_secs(60));

        let handler = f.handler_with(
            Arc::new(f.subscriptions.clone()),
            ReconcileSettings {
                fetch_timeout: Duration::from_millis(200),
                max_update_attempts: 3,
            },
        );
        let outcome = handler.handle(payment_notification("P3")).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Failed(ReconciliationError::TransientProvider(ref m)) if m.contains("timed out")
        ));
        let events = f.events.all().await;
        assert!(events[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(f.stored(&sub).await.status, SubscriptionStatus::Pending);
    }

    #[tokio::test]
    async fn rejected_credentials_mark_event_errored() {
        let f = Fixture::new();
        f.provider.set_fetch_error(
            "P9",
            PaymentFetchError::Rejected {
                status: 401,
                message: "invalid access token".into(),
            },
        );

        let outcome = f.handler().handle(payment_notification("P9")).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Failed(ReconciliationError::Provider(_))
        ));
        assert!(f.events.all().await[0]
            .error
            .as_deref()
            .unwrap()
            .contains("invalid access token"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Partial failures
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_profile_is_an_entitlement_gap_on_a_processed_event() {
        let f = Fixture::new();
        let user = UserId::new("no-profile").unwrap();
        let sub = Subscription::create_pending(user, Plan::Monthly, Timestamp::now());
        f.subscriptions.insert(&sub).await.unwrap();
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);

        let outcome = f.handler().handle(payment_notification("P1")).await;

        match outcome {
            ReconcileOutcome::Activated { profile_error, .. } => {
                assert!(profile_error.unwrap().starts_with("entitlement gap"));
            }
            other => panic!("expected Activated, got {:?}", other),
        }
        assert_eq!(f.stored(&sub).await.status, SubscriptionStatus::Active);
        let events = f.events.all().await;
        assert!(events[0].processed);
        assert!(events[0].error.as_deref().unwrap().starts_with("entitlement gap"));
    }

    #[tokio::test]
    async fn audit_log_outage_does_not_block_reconciliation() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);
        f.events.fail_appends(true);

        let outcome = f.handler().handle(payment_notification("P1")).await;

        assert!(matches!(outcome, ReconcileOutcome::Activated { .. }));
        assert_eq!(f.stored(&sub).await.status, SubscriptionStatus::Active);
    }

    struct FailingPayments;

    #[async_trait]
    impl PaymentRecordRepository for FailingPayments {
        async fn append(&self, _record: &PaymentRecord) -> Result<(), DomainError> {
            Err(DomainError::database("disk full"))
        }
    }

    #[tokio::test]
    async fn history_write_failure_is_persistence_error() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);
        let handler = ReconcileNotificationHandler::new(
            Arc::new(f.events.clone()),
            Arc::new(f.provider.clone()),
            Arc::new(f.subscriptions.clone()),
            Arc::new(FailingPayments),
            Arc::new(f.profiles.clone()),
            ReconcileSettings::default(),
        );

        let outcome = handler.handle(payment_notification("P1")).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Failed(ReconciliationError::Persistence(ref m)) if m.contains("disk full")
        ));
        assert_eq!(f.stored(&sub).await.status, SubscriptionStatus::Pending);
        assert!(f.events.all().await[0].error.is_some());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Races
    // ════════════════════════════════════════════════════════════════════════════

    /// Serves a stale snapshot on the first read, as if another
    /// notification committed between our read and our write.
    struct StaleFirstRead {
        inner: InMemorySubscriptionRepository,
        stale: Subscription,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl SubscriptionRepository for StaleFirstRead {
        async fn insert(&self, s: &Subscription) -> Result<(), DomainError> {
            self.inner.insert(s).await
        }

        async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(Some(self.stale.clone()));
            }
            self.inner.find_by_id(id).await
        }

        async fn update_if_status(
            &self,
            s: &Subscription,
            expected: SubscriptionStatus,
        ) -> Result<bool, DomainError> {
            self.inner.update_if_status(s, expected).await
        }

        async fn set_preference_id(&self, id: &SubscriptionId, p: &str) -> Result<(), DomainError> {
            self.inner.set_preference_id(id, p).await
        }
    }

    #[tokio::test]
    async fn losing_the_race_rereads_and_becomes_a_no_op() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);

        // Another delivery already activated the subscription.
        let mut winner = sub.clone();
        winner.activate("P1", Timestamp::now());
        assert!(f
            .subscriptions
            .update_if_status(&winner, SubscriptionStatus::Pending)
            .await
            .unwrap());

        let repo = Arc::new(StaleFirstRead {
            inner: f.subscriptions.clone(),
            stale: sub.clone(),
            reads: AtomicUsize::new(0),
        });
        let outcome = f
            .handler_with(repo.clone(), ReconcileSettings::default())
            .handle(payment_notification("P1"))
            .await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Unchanged {
                status: SubscriptionStatus::Active,
                ..
            }
        ));
        assert_eq!(repo.reads.load(Ordering::SeqCst), 2);
        assert_eq!(f.stored(&sub).await.ends_at, winner.ends_at);
        assert_eq!(f.subscriptions.write_count().await, 1);
        assert!(f.profiles.grants().await.is_empty());
    }

    /// Every conditional update loses.
    struct AlwaysContended(InMemorySubscriptionRepository);

    #[async_trait]
    impl SubscriptionRepository for AlwaysContended {
        async fn insert(&self, s: &Subscription) -> Result<(), DomainError> {
            self.0.insert(s).await
        }

        async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
            self.0.find_by_id(id).await
        }

        async fn update_if_status(
            &self,
            _: &Subscription,
            _: SubscriptionStatus,
        ) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn set_preference_id(&self, id: &SubscriptionId, p: &str) -> Result<(), DomainError> {
            self.0.set_preference_id(id, p).await
        }
    }

    #[tokio::test]
    async fn exhausted_update_attempts_are_concurrent_modification() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);

        let outcome = f
            .handler_with(
                Arc::new(AlwaysContended(f.subscriptions.clone())),
                ReconcileSettings {
                    max_update_attempts: 2,
                    ..Default::default()
                },
            )
            .handle(payment_notification("P1"))
            .await;

        assert_eq!(
            outcome,
            ReconcileOutcome::Failed(ReconciliationError::ConcurrentModification(sub.id))
        );
        assert!(f.events.all().await[0]
            .error
            .as_deref()
            .unwrap()
            .starts_with("concurrent modification"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_approvals_activate_once() {
        let f = Fixture::new();
        let sub = f.pending_subscription(Plan::Monthly).await;
        f.provider_says("P1", ProviderPaymentStatus::Approved, &sub);
        let handler = Arc::new(f.handler());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move { handler.handle(payment_notification("P1")).await })
            })
            .collect();
        let outcomes: Vec<ReconcileOutcome> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let activations = outcomes
            .iter()
            .filter(|o| matches!(o, ReconcileOutcome::Activated { .. }))
            .count();
        assert_eq!(activations, 1);
        assert_eq!(f.subscriptions.write_count().await, 1);
        assert_eq!(f.profiles.grants().await.len(), 1);

        let events = f.events.all().await;
        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| e.processed && e.error.is_none()));
    }
}
