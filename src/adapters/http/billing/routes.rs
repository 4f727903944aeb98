//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{create_preference, health, receive_notification, BillingAppState};

/// Provider notification endpoints (no auth).
///
/// - `POST /webhook` - Payment notification
/// - `POST /api/mercadopago/webhook` - Payment notification (legacy path)
///
/// These bound their own wait with the ack timeout and must not sit behind
/// a request timeout.
pub fn notification_router() -> Router<BillingAppState> {
    Router::new()
        .route("/webhook", post(receive_notification))
        .route("/api/mercadopago/webhook", post(receive_notification))
}

/// Storefront and operations endpoints.
///
/// - `POST /api/mercadopago/create-preference` - Start a checkout
/// - `GET /health` - Liveness probe
pub fn storefront_router() -> Router<BillingAppState> {
    Router::new()
        .route("/api/mercadopago/create-preference", post(create_preference))
        .route("/health", get(health))
}
