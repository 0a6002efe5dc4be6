use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    warehouse_provider: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub warehouse_provider: &'static str,
    pub checked_at: String,
}

/// Liveness only; the warehouse is never contacted.
pub fn router(warehouse_provider: &'static str) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { warehouse_provider })
}

pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        warehouse_provider: state.warehouse_provider,
        checked_at: Utc::now().to_rfc3339(),
    })
}
