//! CreatePreferenceHandler - Starts a checkout for a premium plan.
//!
//! Creates a `pending` subscription, asks the provider for a checkout
//! preference whose external reference is the subscription id, and stores
//! the preference id on the subscription.

use std::sync::Arc;

use crate::domain::billing::{Plan, PreferenceError, Subscription};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::ports::{Payer, PreferenceGateway, PreferenceRequest, SubscriptionRepository};

/// Command to start a checkout. Fields arrive unvalidated.
#[derive(Debug, Clone, Default)]
pub struct CreatePreferenceCommand {
    pub plan: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub cpf: String,
}

/// Result of a started checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePreferenceResult {
    pub subscription_id: SubscriptionId,
    pub preference_id: String,
    pub init_point: String,
    pub sandbox_init_point: Option<String>,
}

/// Handler for starting a checkout.
pub struct CreatePreferenceHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PreferenceGateway>,
}

impl CreatePreferenceHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PreferenceGateway>,
    ) -> Self {
        Self {
            subscriptions,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePreferenceCommand,
    ) -> Result<CreatePreferenceResult, PreferenceError> {
        // 1. Validate input
        let required = [&cmd.plan, &cmd.user_id, &cmd.name, &cmd.email, &cmd.cpf];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(PreferenceError::MissingFields);
        }
        let plan: Plan = cmd
            .plan
            .trim()
            .parse()
            .map_err(|_| PreferenceError::InvalidPlan(cmd.plan.clone()))?;
        let user_id =
            UserId::new(cmd.user_id.trim()).map_err(|_| PreferenceError::MissingFields)?;

        // 2. Record the pending subscription
        let subscription = Subscription::create_pending(user_id, plan, Timestamp::now());
        self.subscriptions
            .insert(&subscription)
            .await
            .map_err(|e| PreferenceError::Persistence(e.to_string()))?;

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            plan = %plan,
            "Pending subscription created"
        );

        // 3. Create the checkout preference
        let request = PreferenceRequest {
            subscription_id: subscription.id,
            plan,
            payer: Payer::new(cmd.name.trim(), cmd.email.trim(), &cmd.cpf),
        };
        let preference = self.gateway.create_preference(&request).await.map_err(|e| {
            tracing::error!(subscription_id = %subscription.id, error = %e, "Preference creation failed");
            PreferenceError::Provider(e.to_string())
        })?;

        // 4. Link the preference to the subscription. Reconciliation joins on
        // the external reference, so a failure here does not fail the checkout.
        if let Err(e) = self
            .subscriptions
            .set_preference_id(&subscription.id, &preference.id)
            .await
        {
            tracing::warn!(
                subscription_id = %subscription.id,
                preference_id = %preference.id,
                error = %e,
                "Failed to store preference id"
            );
        }

        tracing::info!(
            subscription_id = %subscription.id,
            preference_id = %preference.id,
            "Checkout preference created"
        );

        Ok(CreatePreferenceResult {
            subscription_id: subscription.id,
            preference_id: preference.id,
            init_point: preference.init_point,
            sandbox_init_point: preference.sandbox_init_point,
        })
    }
}
