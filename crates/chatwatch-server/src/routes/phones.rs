//! Phone extraction and rewriting.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhoneEntry {
    /// Display form in the configured format.
    pub rendered: String,
    /// Clipboard form, digits only.
    pub digits: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub phones: Vec<PhoneEntry>,
}

pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Json<ExtractResponse> {
    let phones: Vec<PhoneEntry> = state
        .extractor
        .extract(&req.text)
        .iter()
        .map(|phone| PhoneEntry {
            rendered: state.extractor.render(phone),
            digits: phone.digits().to_string(),
        })
        .collect();
    debug!(target: "chatwatch::phones", "Extracted {} phone(s)", phones.len());
    Json(ExtractResponse { phones })
}

#[derive(Deserialize)]
pub struct RewriteRequest {
    pub text: String,
    /// Any spelling of the number to canonicalize.
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RewriteResponse {
    pub text: String,
    pub replacements: usize,
    pub phone: String,
}

pub async fn rewrite(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RewriteRequest>,
) -> Result<Json<RewriteResponse>, (StatusCode, String)> {
    let phone = state.extractor.normalize(&req.phone).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a recognized phone number", req.phone),
        )
    })?;

    let rewrite = state
        .extractor
        .rewrite(&req.text, &phone)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(RewriteResponse {
        text: rewrite.text,
        replacements: rewrite.replacements,
        phone: state.extractor.render(&phone),
    }))
}
