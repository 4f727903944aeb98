//! HTTP adapter for billing endpoints.
//!
//! Exposes reconciliation and checkout via REST API:
//! - `POST /webhook`, `POST /api/mercadopago/webhook` - Payment notifications
//! - `POST /api/mercadopago/create-preference` - Start a checkout
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState, SERVICE_NAME};
pub use routes::{notification_router, storefront_router};
