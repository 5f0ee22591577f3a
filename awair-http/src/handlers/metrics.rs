use crate::server::AppState;
use awair_observability::prometheus_exporter::CONTENT_TYPE;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

/// Prometheus metrics endpoint handler.
///
/// Always answers in text format 0.0.4; `Accept` is not consulted.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], state.metrics.render())
}
