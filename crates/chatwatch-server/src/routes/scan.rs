//! One-off scan of a posted page.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chatwatch_core::inspect;
use chatwatch_types::{Alarm, ChatRecord, RowHighlight};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ScanRequest {
    pub html: String,
    #[serde(default)]
    pub url: String,
    /// Local time to judge ages against; defaults to the server clock.
    #[serde(default)]
    pub now: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub interface_detected: bool,
    pub threshold_minutes: u32,
    pub records: Vec<ChatRecord>,
    pub highlights: Vec<RowHighlight>,
    pub alarms: Vec<Alarm>,
}

/// Scan without alerting: nothing is added to the ledger.
pub async fn scan_page(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, (StatusCode, String)> {
    let threshold = state.settings().await.notification_interval;
    let now = req.now.unwrap_or_else(|| chrono::Local::now().naive_local());

    let report = inspect(&req.html, &req.url, now, i64::from(threshold))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ScanResponse {
        interface_detected: report.interface_detected,
        threshold_minutes: threshold,
        records: report.records,
        highlights: report.highlights,
        alarms: report.alarms,
    }))
}
