//! HTTP API server with observability for the marketplace backend.
//!
//! Provides REST endpoints for the catalog, carts and orders, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::Clock;
use metrics_exporter_prometheus::PrometheusHandle;
use services::{CartService, CatalogService, OrderService};
use store::ShopStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ShopStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/items",
            get(routes::items::list::<S>).post(routes::items::create::<S>),
        )
        .route("/items/alerts", get(routes::items::alerts::<S>))
        .route(
            "/items/{id}",
            get(routes::items::get::<S>)
                .put(routes::items::update::<S>)
                .delete(routes::items::delete::<S>),
        )
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/add", post(routes::cart::add::<S>))
        .route("/cart/update", put(routes::cart::update::<S>))
        .route("/cart/remove/{item_id}", delete(routes::cart::remove::<S>))
        .route("/cart/clear", delete(routes::cart::clear::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create_from_cart::<S>),
        )
        .route(
            "/orders/single-item",
            post(routes::orders::create_single_item::<S>),
        )
        .route("/orders/admin/all", get(routes::orders::admin_list::<S>))
        .route(
            "/orders/admin/{id}/status",
            put(routes::orders::admin_set_status::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).delete(routes::orders::delete::<S>),
        )
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
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

/// Creates the application state with every service sharing one store.
pub fn create_default_state<S: ShopStore + Clone + 'static>(
    store: S,
    clock: Arc<dyn Clock>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: CatalogService::new(store.clone(), clock.clone()),
        carts: CartService::new(store.clone(), clock.clone()),
        orders: OrderService::new(store, clock),
    })
}
