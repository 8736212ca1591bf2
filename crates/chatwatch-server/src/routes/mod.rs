//! HTTP route handlers.

pub mod messages;
pub mod notifications;
pub mod phones;
pub mod scan;

use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Every route under `/api`, without layers.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/messages", post(messages::dispatch))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}", delete(notifications::dismiss))
        .route("/phones/extract", post(phones::extract))
        .route("/phones/rewrite", post(phones::rewrite))
        .route("/scan", post(scan::scan_page))
        .route("/health", get(health))
}
