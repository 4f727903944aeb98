//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `mercadopago` - Provider API client and mock
//! - `postgres` - PostgreSQL persistence
//! - `memory` - In-memory persistence for tests and local runs
//! - `http` - Axum REST API

pub mod http;
pub mod memory;
pub mod mercadopago;
pub mod postgres;

pub use mercadopago::{MercadoPagoClient, MercadoPagoConfig, MockMercadoPago};
