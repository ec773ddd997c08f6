//! Subscription billing server.
//!
//! Loads `BILLING__*` configuration, connects to PostgreSQL, wires the
//! adapters into the axum router and serves until Ctrl-C or SIGTERM.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_billing::adapters::auth::JwtSessionValidator;
use subscription_billing::adapters::http::{app_router, BillingAppState};
use subscription_billing::adapters::postgres::{
    PostgresPaymentLedger, PostgresPaymentSettlement, PostgresPlanCatalog,
    PostgresSubscriptionRepository,
};
use subscription_billing::adapters::razorpay::{RazorpayConfig, RazorpayGateway};
use subscription_billing::config::{AppConfig, ServerConfig};
use subscription_billing::domain::billing::GatewaySignatureVerifier;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        gateway_test_mode = config.gateway.is_test_mode(),
        "Starting subscription billing"
    );

    let pool = config
        .database
        .pool_options()
        .connect(config.database.url.expose_secret())
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let gateway = RazorpayGateway::new(
        RazorpayConfig::new(
            config.gateway.key_id.clone(),
            config.gateway.key_secret.clone(),
        )
        .with_base_url(config.gateway.api_base_url.clone())
        .with_timeout(config.gateway.request_timeout()),
    )?;

    let state = BillingAppState::new(
        Arc::new(PostgresPlanCatalog::new(pool.clone())),
        Arc::new(PostgresPaymentLedger::new(pool.clone())),
        Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        Arc::new(PostgresPaymentSettlement::new(pool.clone())),
        Arc::new(gateway),
        GatewaySignatureVerifier::new(
            config.gateway.key_secret.clone(),
            config.gateway.webhook_secret.clone(),
        ),
    );

    let sessions = Arc::new(JwtSessionValidator::new(
        &config.auth.jwt_secret,
        &config.auth.issuer,
        &config.auth.audience,
    ));

    let app = app_router(state, sessions, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

/// JSON logs in production, human-readable otherwise.
///
/// `RUST_LOG` overrides `server.log_level`.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if server.is_production() {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
