//! Background coordinator: handles every [`BackgroundRequest`], whether it
//! arrives over HTTP or from the in-process page monitor.

use crate::state::AppState;
use chatwatch_core::{correct_page_text, validate_api_key, NotifiedKey};
use chatwatch_types::{
    BackgroundRequest, BackgroundResponse, NoticeKind, PageCommand, SettingsPatch, Statistics,
    TabId,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn handle(state: &AppState, request: BackgroundRequest) -> BackgroundResponse {
    debug!(target: "chatwatch::api", "Handling {}", request.kind());

    match request {
        BackgroundRequest::ChatNeedsClosing {
            chat_id,
            time_since_last_message,
            url,
            tab_id,
        } => chat_needs_closing(state, chat_id, time_since_last_message, url, tab_id).await,
        BackgroundRequest::GetSettings => BackgroundResponse {
            settings: Some(state.view_of(&state.settings().await)),
            ..BackgroundResponse::ok()
        },
        BackgroundRequest::UpdateSettings { settings } => update_settings(state, settings).await,
        BackgroundRequest::GetStatistics => BackgroundResponse {
            stats: Some(statistics(state).await),
            ..BackgroundResponse::ok()
        },
        BackgroundRequest::ClearNotifications => {
            state.ledger.lock().await.clear();
            state.notifications.lock().await.clear();
            info!(target: "chatwatch::alerts", "Cleared all notifications");
            BackgroundResponse::ok()
        }
        BackgroundRequest::CorrectAllText { api_key, text } => {
            correct_all_text(state, api_key, text).await
        }
        BackgroundRequest::GetApiKey => BackgroundResponse {
            has_api_key: Some(validate_api_key(state.configured_api_key().await.as_deref()).is_ok()),
            ..BackgroundResponse::ok()
        },
    }
}

async fn chat_needs_closing(
    state: &AppState,
    chat_id: String,
    age_minutes: i64,
    url: String,
    tab_id: TabId,
) -> BackgroundResponse {
    if !state.settings().await.enabled {
        debug!(target: "chatwatch::alerts", "Monitoring disabled, ignoring chat {}", chat_id);
        return BackgroundResponse::ok();
    }

    let fresh = state
        .ledger
        .lock()
        .await
        .try_mark(NotifiedKey::new(chat_id.clone(), tab_id), Instant::now());
    if !fresh {
        return BackgroundResponse::ok();
    }

    let notification = state.notifications.lock().await.create(
        &chat_id,
        tab_id,
        &url,
        age_minutes,
        chrono::Utc::now().timestamp_millis(),
    );
    info!(
        target: "chatwatch::alerts",
        "Chat {} has been quiet for {} min ({})",
        chat_id,
        age_minutes,
        notification.id
    );
    BackgroundResponse::ok()
}

async fn update_settings(state: &AppState, patch: SettingsPatch) -> BackgroundResponse {
    match state.update_settings(patch).await {
        Ok(settings) => BackgroundResponse {
            settings: Some(state.view_of(&settings)),
            ..BackgroundResponse::ok()
        },
        Err(e) => {
            warn!(target: "chatwatch::settings", "Rejected settings update: {}", e);
            BackgroundResponse::failure(e.to_string())
        }
    }
}

async fn statistics(state: &AppState) -> Statistics {
    Statistics {
        active_notifications: state.notifications.lock().await.len(),
        notified_chats_count: state.ledger.lock().await.len(Instant::now()),
        is_enabled: state.settings().await.enabled,
    }
}

async fn correct_all_text(
    state: &AppState,
    request_key: Option<String>,
    text: Option<String>,
) -> BackgroundResponse {
    let configured = state.configured_api_key().await;
    let request_key = request_key.filter(|k| !k.trim().is_empty());

    // without text, ask the page for the active field's contents first
    if text.is_none() && validate_api_key(request_key.as_deref().or(configured.as_deref())).is_ok()
    {
        return BackgroundResponse {
            commands: vec![PageCommand::GetAllTextFromActiveElement],
            ..BackgroundResponse::failure("text required: resend with the active element's text")
        };
    }

    let outcome = correct_page_text(
        state.corrector.as_ref(),
        request_key.as_deref(),
        configured.as_deref(),
        text.as_deref(),
    )
    .await;

    match outcome.result {
        Ok(corrected) => BackgroundResponse {
            corrected_text: Some(corrected),
            ..BackgroundResponse::ok().with_commands(outcome.commands)
        },
        Err(e) => {
            warn!(target: "chatwatch::corrector", "Correction failed: {}", e);
            BackgroundResponse {
                commands: outcome.commands,
                ..BackgroundResponse::failure(e.to_string())
            }
        }
    }
}

/// Feed requests from the page monitor into the coordinator until the
/// monitor drops its sender.
pub async fn drain(state: Arc<AppState>, mut rx: mpsc::Receiver<BackgroundRequest>) {
    while let Some(request) = rx.recv().await {
        let response = handle(&state, request).await;
        if !response.success {
            warn!(
                target: "chatwatch::monitor",
                "Monitor request failed: {}",
                response.error.unwrap_or_default()
            );
        }
    }
    debug!(target: "chatwatch::monitor", "Monitor channel closed");
}

/// Notice shown when a request cannot be parsed at all.
pub fn malformed_request(reason: &str) -> BackgroundResponse {
    BackgroundResponse {
        commands: vec![PageCommand::notice(NoticeKind::Error, format!("Некорректный запрос: {reason}"))],
        ..BackgroundResponse::failure(reason)
    }
}
