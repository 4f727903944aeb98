//! Payment observations fetched from the provider and their history entries.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentRecordId, SubscriptionId, Timestamp};

use super::ProviderPaymentStatus;

/// Authoritative state of a provider payment at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Provider payment id.
    pub payment_id: String,

    pub status: ProviderPaymentStatus,

    pub status_detail: Option<String>,

    /// The subscription id we sent when creating the preference.
    pub external_reference: Option<String>,

    pub amount_cents: Option<i64>,

    pub payment_method_id: Option<String>,

    pub payment_type_id: Option<String>,

    pub installments: Option<i32>,

    pub payer_email: Option<String>,

    pub payer_name: Option<String>,

    pub payer_identification: Option<String>,

    pub approved_at: Option<Timestamp>,

    /// Provider response as received.
    pub raw: serde_json::Value,
}

impl PaymentDetails {
    /// Resolves the external reference to a subscription id.
    ///
    /// Returns `None` when the reference is missing or not a subscription id.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.external_reference
            .as_deref()
            .and_then(|reference| reference.parse().ok())
    }
}

/// Append-only payment history entry, one per fetched observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentRecordId,

    /// External reference exactly as delivered by the provider.
    pub subscription_reference: Option<String>,

    pub payment_id: String,

    pub status: ProviderPaymentStatus,

    pub status_detail: Option<String>,

    pub amount_cents: Option<i64>,

    pub payment_method_id: Option<String>,

    pub payment_type_id: Option<String>,

    pub installments: Option<i32>,

    pub payer_email: Option<String>,

    pub payer_name: Option<String>,

    pub payer_identification: Option<String>,

    pub approved_at: Option<Timestamp>,

    pub raw_payload: serde_json::Value,

    pub created_at: Timestamp,
}

impl PaymentRecord {
    /// Builds the history entry for a fetched payment.
    pub fn observed(details: &PaymentDetails, now: Timestamp) -> Self {
        Self {
            id: PaymentRecordId::new(),
            subscription_reference: details.external_reference.clone(),
            payment_id: details.payment_id.clone(),
            status: details.status.clone(),
            status_detail: details.status_detail.clone(),
            amount_cents: details.amount_cents,
            payment_method_id: details.payment_method_id.clone(),
            payment_type_id: details.payment_type_id.clone(),
            installments: details.installments,
            payer_email: details.payer_email.clone(),
            payer_name: details.payer_name.clone(),
            payer_identification: details.payer_identification.clone(),
            approved_at: details.approved_at,
            raw_payload: details.raw.clone(),
            created_at: now,
        }
    }
}

/// Converts a provider decimal amount to cents.
pub fn amount_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
