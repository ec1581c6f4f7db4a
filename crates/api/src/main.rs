//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::seed::CatalogSeed;
use api::{AppState, create_app};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::{HttpPaymentGateway, PaymentGateway};
use store::{InMemoryStore, PostgresStore, Store};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S, G>(config: &Config, state: AppState<S, G>, metrics_handle: PrometheusHandle)
where
    S: Store,
    G: PaymentGateway + Clone + 'static,
{
    let app = create_app(Arc::new(state), metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Collaborators and payment gateway
    let seed = match &config.catalog_seed {
        Some(path) => CatalogSeed::load(path).expect("failed to load catalog seed"),
        None => {
            tracing::warn!("CATALOG_SEED_FILE not set, starting with an empty catalog");
            CatalogSeed::default()
        }
    };
    let (catalog, vendors) = seed.into_services();
    let gateway =
        HttpPaymentGateway::new(config.gateway.clone()).expect("failed to build gateway client");

    // 4. Store backend, then serve
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            let state = AppState::new(store, gateway, catalog, vendors, config.checkout.clone());
            serve(&config, state, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, state is kept in memory");
            let state = AppState::new(
                InMemoryStore::new(),
                gateway,
                catalog,
                vendors,
                config.checkout.clone(),
            );
            serve(&config, state, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
