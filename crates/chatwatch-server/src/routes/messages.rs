//! The message endpoint: one typed request in, one response envelope out.

use crate::coordinator;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chatwatch_types::{BackgroundRequest, BackgroundResponse};
use std::sync::Arc;
use tracing::warn;

/// Failures inside a well-formed request are reported in the envelope with
/// status 200; only unparseable requests get 400.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BackgroundRequest>, JsonRejection>,
) -> (StatusCode, Json<BackgroundResponse>) {
    match payload {
        Ok(Json(request)) => (StatusCode::OK, Json(coordinator::handle(&state, request).await)),
        Err(rejection) => {
            warn!(target: "chatwatch::api", "Malformed message: {}", rejection.body_text());
            (
                StatusCode::BAD_REQUEST,
                Json(coordinator::malformed_request(&rejection.body_text())),
            )
        }
    }
}
