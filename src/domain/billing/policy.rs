//! Subscription state-transition policy.
//!
//! Pure function from (current subscription, fetched payment) to the
//! change to persist. Re-applying an observation the subscription already
//! reflects yields `Unchanged`, which is what makes reconciliation
//! idempotent under duplicate and replayed notifications.

use crate::domain::foundation::Timestamp;

use super::{PaymentDetails, Subscription, SubscriptionStatus};

/// What reconciliation should do with a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Persist `updated`, conditional on the status still being `from`.
    Apply {
        from: SubscriptionStatus,
        updated: Subscription,
    },

    /// Subscription already has the target status. No write.
    Unchanged(SubscriptionStatus),

    /// Provider status with no rule. No write.
    Unhandled(String),
}

impl Transition {
    /// Target status of an applied transition.
    pub fn target(&self) -> Option<SubscriptionStatus> {
        match self {
            Transition::Apply { updated, .. } => Some(updated.status),
            _ => None,
        }
    }
}

/// Decides how `payment` changes `current`.
///
/// | payment status          | subscription becomes |
/// |-------------------------|----------------------|
/// | approved                | active (new period)  |
/// | rejected, cancelled     | cancelled            |
/// | in_process, pending     | pending              |
/// | anything else           | unchanged            |
pub fn decide(current: &Subscription, payment: &PaymentDetails, now: Timestamp) -> Transition {
    let Some(target) = payment.status.target_status() else {
        return Transition::Unhandled(payment.status.to_string());
    };

    if current.status == target {
        return Transition::Unchanged(target);
    }

    let mut updated = current.clone();
    match target {
        SubscriptionStatus::Active => updated.activate(payment.payment_id.clone(), now),
        SubscriptionStatus::Cancelled => updated.cancel(now),
        SubscriptionStatus::Pending => updated.mark_pending(now),
    }

    Transition::Apply {
        from: current.status,
        updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::payment::test_support::payment;
    use crate::domain::billing::{Plan, ProviderPaymentStatus};
    use crate::domain::foundation::UserId;
    use proptest::prelude::*;

    fn subscription(plan: Plan, status: SubscriptionStatus) -> Subscription {
        let mut sub = Subscription::create_pending(
            UserId::new("user-1").unwrap(),
            plan,
            Timestamp::now().add_days(-3),
        );
        sub.status = status;
        sub
    }

    fn observed(status: ProviderPaymentStatus) -> PaymentDetails {
        payment("P1", status, None)
    }

    #[test]
    fn approved_activates_pending_monthly_subscription() {
        let now = Timestamp::now();
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Pending);

        match decide(&sub, &observed(ProviderPaymentStatus::Approved), now) {
            Transition::Apply { from, updated } => {
                assert_eq!(from, SubscriptionStatus::Pending);
                assert_eq!(updated.status, SubscriptionStatus::Active);
                assert_eq!(updated.starts_at, Some(now));
                assert_eq!(updated.ends_at, Some(now.add_months(1)));
                assert_eq!(updated.next_billing_at, Some(now.add_months(1)));
                assert_eq!(updated.provider_payment_id.as_deref(), Some("P1"));
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn approved_uses_stored_plan_for_yearly() {
        let now = Timestamp::now();
        let sub = subscription(Plan::Yearly, SubscriptionStatus::Pending);

        let transition = decide(&sub, &observed(ProviderPaymentStatus::Approved), now);
        match transition {
            Transition::Apply { updated, .. } => {
                assert_eq!(updated.ends_at, Some(now.add_years(1)));
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn approved_on_active_subscription_is_unchanged() {
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Active);
        assert_eq!(
            decide(&sub, &observed(ProviderPaymentStatus::Approved), Timestamp::now()),
            Transition::Unchanged(SubscriptionStatus::Active)
        );
    }

    #[test]
    fn approved_reactivates_cancelled_subscription() {
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Cancelled);
        let transition = decide(&sub, &observed(ProviderPaymentStatus::Approved), Timestamp::now());
        assert_eq!(transition.target(), Some(SubscriptionStatus::Active));
    }

    #[test]
    fn rejected_cancels_pending_subscription() {
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Pending);
        let transition = decide(&sub, &observed(ProviderPaymentStatus::Rejected), Timestamp::now());
        assert_eq!(transition.target(), Some(SubscriptionStatus::Cancelled));
    }

    #[test]
    fn rejected_on_cancelled_subscription_is_unchanged() {
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Cancelled);
        assert_eq!(
            decide(&sub, &observed(ProviderPaymentStatus::Rejected), Timestamp::now()),
            Transition::Unchanged(SubscriptionStatus::Cancelled)
        );
    }

    #[test]
    fn in_process_on_pending_subscription_is_unchanged() {
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Pending);
        assert_eq!(
            decide(&sub, &observed(ProviderPaymentStatus::InProcess), Timestamp::now()),
            Transition::Unchanged(SubscriptionStatus::Pending)
        );
    }

    #[test]
    fn pending_moves_active_subscription_back_to_pending() {
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Active);
        let transition = decide(&sub, &observed(ProviderPaymentStatus::Pending), Timestamp::now());
        assert_eq!(transition.target(), Some(SubscriptionStatus::Pending));
    }

    #[test]
    fn unrecognized_status_is_unhandled() {
        let sub = subscription(Plan::Monthly, SubscriptionStatus::Pending);
        assert_eq!(
            decide(
                &sub,
                &observed(ProviderPaymentStatus::Unrecognized("refunded".into())),
                Timestamp::now()
            ),
            Transition::Unhandled("refunded".into())
        );
    }

    fn any_provider_status() -> impl Strategy<Value = ProviderPaymentStatus> {
        prop_oneof![
            Just(ProviderPaymentStatus::Approved),
            Just(ProviderPaymentStatus::Rejected),
            Just(ProviderPaymentStatus::Cancelled),
            Just(ProviderPaymentStatus::InProcess),
            Just(ProviderPaymentStatus::Pending),
            "[a-z_]{1,12}".prop_map(|s| ProviderPaymentStatus::parse(&s)),
        ]
    }

    fn any_subscription_status() -> impl Strategy<Value = SubscriptionStatus> {
        prop_oneof![
            Just(SubscriptionStatus::Pending),
            Just(SubscriptionStatus::Active),
            Just(SubscriptionStatus::Cancelled),
        ]
    }

    proptest! {
        #[test]
        fn applying_an_observation_twice_changes_nothing_the_second_time(
            start in any_subscription_status(),
            status in any_provider_status(),
            yearly in any::<bool>(),
            later_days in 0i64..400,
        ) {
            let plan = if yearly { Plan::Yearly } else { Plan::Monthly };
            let sub = subscription(plan, start);
            let first_at = Timestamp::now();
            let observation = observed(status);

            let after_first = match decide(&sub, &observation, first_at) {
                Transition::Apply { updated, .. } => updated,
                _ => sub.clone(),
            };

            let second = decide(&after_first, &observation, first_at.add_days(later_days));
            prop_assert!(!matches!(second, Transition::Apply { .. }), "replayed observation produced a second Apply");
        }

        #[test]
        fn replayed_approvals_keep_first_period(
            replays in 1usize..8,
            yearly in any::<bool>(),
        ) {
            let plan = if yearly { Plan::Yearly } else { Plan::Monthly };
            let mut sub = subscription(plan, SubscriptionStatus::Pending);
            let first_at = Timestamp::now();
            let approved = observed(ProviderPaymentStatus::Approved);

            if let Transition::Apply { updated, .. } = decide(&sub, &approved, first_at) {
                sub = updated;
            }
            let ends_at = sub.ends_at;

            for i in 0..replays {
                let at = first_at.add_days(i as i64 + 1);
                if let Transition::Apply { updated, .. } = decide(&sub, &approved, at) {
                    sub = updated;
                }
            }

            prop_assert_eq!(sub.status, SubscriptionStatus::Active);
            prop_assert_eq!(sub.ends_at, ends_at);
            prop_assert_eq!(sub.next_billing_at, ends_at);
        }
    }
}
