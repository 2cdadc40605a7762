//! Steeple billing service entrypoint.
//!
//! Loads configuration, connects to PostgreSQL, wires the Stripe and
//! notification adapters into the billing router, and serves it with
//! tracing, CORS, timeout, and request-id layers.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{middleware, Json, Router};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use steeple_billing::adapters::http::middleware::{auth_middleware, JwtVerifier};
use steeple_billing::adapters::http::{payment_router, BillingAppState};
use steeple_billing::adapters::notifications::{EmailNotifier, NotifierConfig};
use steeple_billing::adapters::postgres::{
    PostgresChurchDirectory, PostgresEventStore, PostgresPlanCatalog, PostgresSessionLedger,
    PostgresSubscriptionLedger,
};
use steeple_billing::adapters::stripe::{StripeConfig, StripeGateway};
use steeple_billing::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting steeple-billing"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database connection pool established");

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations completed");
    }

    let mut stripe_config = StripeConfig::new(
        config.payment.stripe_api_key.clone(),
        config.payment.stripe_webhook_secret.clone(),
    )
    .with_require_livemode(config.payment.require_livemode);
    if let Some(url) = &config.payment.api_base_url {
        stripe_config = stripe_config.with_base_url(url.clone());
    }
    if let Some(url) = &config.payment.checkout_return_url {
        stripe_config = stripe_config.with_return_url(url.clone());
    }

    let mut notifier_config = NotifierConfig::new(config.notifications.base_url.clone())
        .with_timeout(config.notifications.send_timeout());
    if let Some(token) = &config.notifications.service_token {
        notifier_config = notifier_config.with_service_token(token.clone());
    }

    let state = BillingAppState {
        church_directory: Arc::new(PostgresChurchDirectory::new(pool.clone())),
        plan_catalog: Arc::new(PostgresPlanCatalog::new(pool.clone())),
        subscription_ledger: Arc::new(PostgresSubscriptionLedger::new(pool.clone())),
        session_ledger: Arc::new(PostgresSessionLedger::new(pool.clone())),
        event_store: Arc::new(PostgresEventStore::new(pool.clone())),
        billing_gateway: Arc::new(StripeGateway::new(stripe_config)),
        billing_notifier: Arc::new(EmailNotifier::new(notifier_config)),
    };

    let verifier = Arc::new(JwtVerifier::new(&SecretString::new(
        config.auth.jwt_secret.clone(),
    )));

    let app = Router::new()
        .route("/health", get(health))
        .merge(payment_router().with_state(state))
        .layer(middleware::from_fn_with_state(verifier, auth_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "steeple-billing listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides the configured filter; production emits JSON lines
/// for the log pipeline, development stays human-readable.
fn init_tracing(server: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Build the CORS layer from configured origins.
///
/// An explicit allowlist when origins are configured; permissive otherwise
/// so local frontends can hit a dev instance without ceremony.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// GET /health - service liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "steeple-billing",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
