//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the billing command handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::{
    CreatePreferenceCommand, CreatePreferenceHandler, ReconcileNotificationCommand,
    ReconcileNotificationHandler,
};
use crate::domain::billing::PreferenceError;
use crate::domain::foundation::Timestamp;

use super::dto::{
    CreatePreferenceRequest, CreatePreferenceResponse, ErrorResponse, HealthResponse, WebhookAck,
};

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "MonjaPro API";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub reconcile_handler: Arc<ReconcileNotificationHandler>,
    pub create_preference_handler: Arc<CreatePreferenceHandler>,
    /// How long a notification request waits for reconciliation before
    /// acknowledging anyway.
    pub ack_timeout: Duration,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook, POST /api/mercadopago/webhook - Receive a payment notification.
///
/// Always answers 200. Reconciliation runs in its own task; if it outlives
/// `ack_timeout` the request returns and the task keeps running.
pub async fn receive_notification(
    State(state): State<BillingAppState>,
    body: Bytes,
) -> impl IntoResponse {
    let handler = state.reconcile_handler.clone();
    let cmd = ReconcileNotificationCommand {
        body: body.to_vec(),
    };
    let task = tokio::spawn(async move { handler.handle(cmd).await });

    match tokio::time::timeout(state.ack_timeout, task).await {
        Ok(Ok(outcome)) => tracing::debug!(?outcome, "Notification reconciled"),
        Ok(Err(e)) => tracing::error!(error = %e, "Reconciliation task aborted"),
        Err(_) => tracing::warn!(
            ack_timeout_ms = state.ack_timeout.as_millis() as u64,
            "Acknowledging notification before reconciliation finished"
        ),
    }

    (StatusCode::OK, Json(WebhookAck::ok()))
}

/// POST /api/mercadopago/create-preference - Start a checkout.
pub async fn create_preference(
    State(state): State<BillingAppState>,
    payload: Result<Json<CreatePreferenceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable checkout request");
            return Err(PreferenceError::MissingFields.into());
        }
    };

    let result = state
        .create_preference_handler
        .handle(CreatePreferenceCommand::from(request))
        .await?;

    Ok(Json(CreatePreferenceResponse::from(result)))
}

/// GET /health - Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Timestamp::now().to_rfc3339(),
        service: SERVICE_NAME.to_string(),
    })
}

/// Fallback for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Endpoint não encontrado")),
    )
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts checkout errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(PreferenceError);

impl From<PreferenceError> for BillingApiError {
    fn from(err: PreferenceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let message = self.0.to_string();
        let (status, body) = if self.0.is_client_error() {
            (StatusCode::BAD_REQUEST, ErrorResponse::new(message))
        } else {
            tracing::error!(error = ?self.0, "Checkout failed");
            let body = match self.0.detail() {
                Some(detail) => ErrorResponse::with_details(message, detail),
                None => ErrorResponse::new(message),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, body)
        };
        (status, Json(body)).into_response()
    }
}
