//! Mercado Pago adapter.
//!
//! - `client` - REST client for payments and checkout preferences
//! - `wire_types` - API request/response objects
//! - `mock_gateway` - In-process stand-in for tests

mod client;
mod mock_gateway;
mod wire_types;

pub use client::{MercadoPagoClient, MercadoPagoConfig};
pub use mock_gateway::MockMercadoPago;
