//! HTTP API server with observability for the checkout system.
//!
//! Provides REST endpoints for carts, checkout and payment settlement,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::PaymentGateway;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store,
    G: PaymentGateway + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/carts", post(routes::carts::open::<S, G>))
        .route(
            "/carts/{id}",
            get(routes::carts::get::<S, G>)
                .patch(routes::carts::update::<S, G>)
                .delete(routes::carts::abandon::<S, G>),
        )
        .route(
            "/carts/{id}/items",
            post(routes::carts::add_item::<S, G>).put(routes::carts::update_item::<S, G>),
        )
        .route(
            "/carts/{id}/items/{product_id}/{sku}",
            delete(routes::carts::remove_item::<S, G>),
        )
        .route("/carts/{id}/checkout", post(routes::carts::checkout::<S, G>))
        .route(
            "/payments/session",
            post(routes::payments::initiate_session::<S, G>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .route("/orders/{id}/history", get(routes::orders::history::<S, G>))
        .route(
            "/orders/{id}/payment-status",
            post(routes::orders::payment_status::<S, G>),
        )
        .route("/orders/{id}/refund", post(routes::orders::refund::<S, G>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
