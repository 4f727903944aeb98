//! PreferenceGateway port - Checkout preference creation at the provider.

use async_trait::async_trait;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, SubscriptionId};

/// Request to create a checkout preference for a subscription.
#[derive(Debug, Clone)]
pub struct PreferenceRequest {
    /// Sent as the external reference and item id.
    pub subscription_id: SubscriptionId,

    pub plan: Plan,

    pub payer: Payer,
}

/// Buyer details prefilled on the checkout page.
#[derive(Debug, Clone)]
pub struct Payer {
    pub name: String,

    pub email: String,

    /// CPF, digits only.
    pub cpf: String,
}

impl Payer {
    /// Builds a payer, stripping CPF punctuation.
    pub fn new(name: impl Into<String>, email: impl Into<String>, cpf: &str) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            cpf: cpf.chars().filter(char::is_ascii_digit).collect(),
        }
    }
}

/// A created checkout preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub id: String,

    /// Checkout URL.
    pub init_point: String,

    pub sandbox_init_point: Option<String>,
}

#[async_trait]
pub trait PreferenceGateway: Send + Sync {
    async fn create_preference(&self, request: &PreferenceRequest)
        -> Result<Preference, DomainError>;
}
