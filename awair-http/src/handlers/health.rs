use crate::server::AppState;
use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let last_success = state.metrics.last_success.get();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sensor_up": state.metrics.is_up(),
        "last_success_unix": (last_success > 0.0).then_some(last_success),
    }))
}
