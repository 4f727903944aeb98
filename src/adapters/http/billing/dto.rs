//! HTTP DTOs for billing endpoints.
//!
//! Field names on the checkout endpoint are Portuguese; the storefront
//! already sends and reads them that way.

use serde::{Deserialize, Serialize};

use crate::application::{CreatePreferenceCommand, CreatePreferenceResult};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a checkout.
///
/// Every field is optional at the wire level so that missing fields surface
/// as a validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePreferenceRequest {
    #[serde(default)]
    pub plano: Option<String>,
    #[serde(default)]
    pub usuario_id: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
}

impl From<CreatePreferenceRequest> for CreatePreferenceCommand {
    fn from(req: CreatePreferenceRequest) -> Self {
        Self {
            plan: req.plano.unwrap_or_default(),
            user_id: req.usuario_id.unwrap_or_default(),
            name: req.nome.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            cpf: req.cpf.unwrap_or_default(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned for every notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// A started checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePreferenceResponse {
    pub success: bool,
    pub assinatura_id: String,
    pub preference_id: String,
    pub init_point: String,
    pub sandbox_init_point: Option<String>,
}

impl From<CreatePreferenceResult> for CreatePreferenceResponse {
    fn from(result: CreatePreferenceResult) -> Self {
        Self {
            success: true,
            assinatura_id: result.subscription_id.to_string(),
            preference_id: result.preference_id,
            init_point: result.init_point,
            sandbox_init_point: result.sandbox_init_point,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
}

/// Error body for the checkout endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Internal detail, only on server errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
