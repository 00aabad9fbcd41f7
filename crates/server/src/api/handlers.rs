use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use pila_core::{PublicConfig, QueueStats, TransactionType};

use super::ApiError;
use crate::metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<PublicConfig> {
    Json(state.public_config())
}

pub async fn transaction_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TransactionType>>, ApiError> {
    Ok(Json(state.queue().transaction_types()?))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(state.queue().stats()?))
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    metrics::collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}
