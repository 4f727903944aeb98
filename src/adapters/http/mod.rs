//! HTTP adapters - REST API implementations.
//!
//! Each domain module has its own HTTP adapter for endpoint exposure;
//! `app` wraps them with the server-wide layers.

pub mod billing;

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

// Re-export key types for convenience
pub use billing::{notification_router, storefront_router};
pub use billing::BillingAppState;

/// Builds the full application router.
///
/// The request timeout wraps the storefront routes only. Notification routes
/// bound their own wait with `ack_timeout` and always answer 200.
pub fn app(state: BillingAppState, server: &ServerConfig) -> Router {
    let storefront = storefront_router().layer(TimeoutLayer::new(Duration::from_secs(
        server.request_timeout_secs,
    )));

    notification_router()
        .merge(storefront)
        .fallback(billing::handlers::not_found)
        .with_state(state)
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the storefront. With no configured origins any origin is allowed.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}
