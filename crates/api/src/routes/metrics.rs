//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}

/// Registers help text for the metrics recorded by the services.
pub fn describe() {
    metrics::describe_counter!("orders_created_total", "Orders placed successfully");
    metrics::describe_counter!("orders_cancelled_total", "Orders cancelled by their owner");
    metrics::describe_counter!(
        "order_creation_rejected_total",
        "Order placements rejected, by reason"
    );
    metrics::describe_counter!(
        "order_status_forced_total",
        "Operator status changes that bypassed the lifecycle checks"
    );
    metrics::describe_counter!(
        "stock_units_reserved_total",
        Unit::Count,
        "Units taken off the shelf by placed orders"
    );
    metrics::describe_counter!(
        "stock_units_restocked_total",
        Unit::Count,
        "Units returned to the shelf by cancellations"
    );
    metrics::describe_histogram!(
        "order_placement_duration_seconds",
        Unit::Seconds,
        "Time spent placing an order, including stock reservation"
    );
}
