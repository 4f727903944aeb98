//! Subscription reconciler server.
//!
//! Wires configuration, persistence and the Mercado Pago client into the
//! billing router and serves it until Ctrl+C.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use subscription_reconciler::adapters::http::{self, BillingAppState};
use subscription_reconciler::adapters::memory::{
    InMemoryPaymentRecordRepository, InMemoryProfileWriter, InMemorySubscriptionRepository,
    InMemoryWebhookEventStore,
};
use subscription_reconciler::adapters::postgres::{
    PostgresPaymentRecordRepository, PostgresProfileWriter, PostgresSubscriptionRepository,
    PostgresWebhookEventStore, MIGRATOR,
};
use subscription_reconciler::adapters::{MercadoPagoClient, MercadoPagoConfig};
use subscription_reconciler::application::{
    CreatePreferenceHandler, ReconcileNotificationHandler, ReconcileSettings,
};
use subscription_reconciler::config::{AppConfig, ConfigError, DatabaseConfig, ValidationError};
use subscription_reconciler::ports::{
    PaymentRecordRepository, ProfileWriter, SubscriptionRepository, WebhookEventStore,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence ports, backed by PostgreSQL or memory.
struct Stores {
    events: Arc<dyn WebhookEventStore>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentRecordRepository>,
    profiles: Arc<dyn ProfileWriter>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server exited with error");
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Starting subscription reconciler"
    );

    let stores = connect_stores(&config.database).await?;
    let provider = Arc::new(MercadoPagoClient::new(
        MercadoPagoConfig::from_payment_config(&config.payment),
    )?);

    let settings = ReconcileSettings {
        fetch_timeout: config.payment.request_timeout(),
        max_update_attempts: config.reconciliation.max_update_attempts,
    };
    let state = BillingAppState {
        reconcile_handler: Arc::new(ReconcileNotificationHandler::new(
            stores.events,
            provider.clone(),
            stores.subscriptions.clone(),
            stores.payments,
            stores.profiles,
            settings,
        )),
        create_preference_handler: Arc::new(CreatePreferenceHandler::new(
            stores.subscriptions,
            provider,
        )),
        ack_timeout: config.reconciliation.ack_timeout(),
    };

    let app = http::app(state, &config.server);
    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn connect_stores(config: &DatabaseConfig) -> Result<Stores, StartupError> {
    if !config.is_configured() {
        tracing::warn!("No database configured; using in-memory stores");
        return Ok(Stores {
            events: Arc::new(InMemoryWebhookEventStore::new()),
            subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
            payments: Arc::new(InMemoryPaymentRecordRepository::new()),
            profiles: Arc::new(InMemoryProfileWriter::new()),
        });
    }

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await?;
    tracing::info!("Database connection established");

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        MIGRATOR.run(&pool).await?;
    }

    Ok(Stores {
        events: Arc::new(PostgresWebhookEventStore::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRecordRepository::new(pool.clone())),
        profiles: Arc::new(PostgresProfileWriter::new(pool)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
