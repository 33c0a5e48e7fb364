//! HTTP API server for the commerce core.
//!
//! Provides REST endpoints for carts, checkout, orders and payment
//! webhooks, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{CartService, CheckoutService, NoDiscount, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{InMemoryPaymentGateway, PaymentProcessor};
use store::CommerceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CommerceStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart", delete(routes::cart::clear::<S>))
        .route("/cart/lines", post(routes::cart::add_line::<S>))
        .route(
            "/cart/lines/{product_id}",
            put(routes::cart::update_line::<S>),
        )
        .route(
            "/cart/lines/{product_id}",
            delete(routes::cart::remove_line::<S>),
        )
        .route("/cart/merge", post(routes::cart::merge::<S>))
        .route("/checkout", post(routes::checkout::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/status", post(routes::orders::advance::<S>))
        .route("/orders/{id}/pay", post(routes::orders::pay::<S>))
        .route("/webhooks/payment", post(routes::webhooks::payment::<S>))
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

/// Creates the default application state: services over the given store,
/// the no-op discount resolver and the in-memory payment gateway. A real
/// deployment swaps the collaborators here.
pub fn create_default_state<S: CommerceStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    let discounts = Arc::new(NoDiscount);
    let gateway = Arc::new(InMemoryPaymentGateway::new());

    Arc::new(AppState {
        carts: CartService::new(store.clone()),
        checkout: CheckoutService::new(store.clone(), discounts),
        orders: OrderService::new(store.clone()),
        payments: PaymentProcessor::new(store, gateway),
    })
}
