//! Stored alert routes.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chatwatch_types::StoredNotification;
use std::sync::Arc;
use tracing::info;

pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<StoredNotification>> {
    Json(state.notifications.lock().await.list())
}

/// Dismiss one alert. The chat stays in the dedup ledger until its cool-down ends.
pub async fn dismiss(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredNotification>, (StatusCode, String)> {
    let removed = state.notifications.lock().await.dismiss(&id);
    match removed {
        Some(notification) => {
            info!(target: "chatwatch::alerts", "Dismissed {}", notification.id);
            Ok(Json(notification))
        }
        None => Err((StatusCode::NOT_FOUND, format!("Notification {} not found", id))),
    }
}
