//! Mercado Pago API objects.
//!
//! Only the fields this service reads are declared; everything else is
//! ignored on decode and kept in the raw payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::billing::{amount_to_cents, PaymentDetails, ProviderPaymentStatus};
use crate::domain::foundation::Timestamp;

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /v1/payments/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MpPayment {
    pub id: Option<MpId>,
    pub status: Option<String>,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    pub transaction_amount: Option<f64>,
    pub payment_method_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub installments: Option<i32>,
    pub payer: Option<MpPayer>,
    pub date_approved: Option<String>,
}

/// Payment ids are numbers, but tolerate strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MpId {
    Number(i64),
    Text(String),
}

impl MpId {
    fn into_string(self) -> String {
        match self {
            MpId::Number(n) => n.to_string(),
            MpId::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MpPayer {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub identification: Option<MpIdentification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MpIdentification {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub number: Option<String>,
}

impl MpPayment {
    /// Maps to the domain view. `requested_id` fills in a missing `id`.
    pub fn into_details(self, requested_id: &str, raw: serde_json::Value) -> PaymentDetails {
        let payer = self.payer;
        PaymentDetails {
            payment_id: self
                .id
                .map(MpId::into_string)
                .unwrap_or_else(|| requested_id.to_string()),
            status: ProviderPaymentStatus::parse(self.status.as_deref().unwrap_or_default()),
            status_detail: self.status_detail,
            external_reference: self.external_reference.filter(|r| !r.trim().is_empty()),
            amount_cents: self.transaction_amount.map(amount_to_cents),
            payment_method_id: self.payment_method_id,
            payment_type_id: self.payment_type_id,
            installments: self.installments,
            payer_email: payer.as_ref().and_then(|p| p.email.clone()),
            payer_name: payer.as_ref().and_then(|p| p.first_name.clone()),
            payer_identification: payer
                .and_then(|p| p.identification)
                .and_then(|i| i.number),
            approved_at: self.date_approved.as_deref().and_then(parse_provider_date),
            raw,
        }
    }
}

/// Provider dates carry an offset (`2024-01-15T10:30:00.000-04:00`).
fn parse_provider_date(value: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
}

/// Error body returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MpErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl MpErrorBody {
    pub fn describe(&self, fallback: &str) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout preferences
// ════════════════════════════════════════════════════════════════════════════════

/// `POST /checkout/preferences` body.
#[derive(Debug, Clone, Serialize)]
pub struct MpPreferenceBody {
    pub items: Vec<MpItem>,
    pub payer: MpPreferencePayer,
    pub payment_methods: MpPaymentMethods,
    pub back_urls: MpBackUrls,
    pub notification_url: String,
    pub auto_return: &'static str,
    pub external_reference: String,
    pub statement_descriptor: String,
    pub expires: bool,
    pub expiration_date_from: String,
    pub expiration_date_to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub currency_id: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpPreferencePayer {
    pub name: String,
    pub email: String,
    pub identification: MpPreferenceIdentification,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpPreferenceIdentification {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpPaymentMethods {
    pub excluded_payment_types: Vec<String>,
    pub excluded_payment_methods: Vec<String>,
    pub installments: u32,
    pub default_installments: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpBackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// `POST /checkout/preferences` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MpPreferenceResponse {
    pub id: Option<String>,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
}
