//! Message protocol between the page side and the background coordinator.
//!
//! Requests are tagged by `type` (`CHAT_NEEDS_CLOSING`, `GET_SETTINGS`, ...).
//! Commands the background wants applied to the page are tagged by `action`.

use serde::{Deserialize, Serialize};

use crate::{SettingsPatch, SettingsView};

/// Browser-tab style identifier of the page that raised a request.
pub type TabId = u32;

/// Requests handled by the background coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum BackgroundRequest {
    /// An unpinned chat crossed the inactivity threshold.
    ChatNeedsClosing {
        chat_id: String,
        time_since_last_message: i64,
        url: String,
        #[serde(default)]
        tab_id: TabId,
    },
    GetSettings,
    UpdateSettings { settings: SettingsPatch },
    GetStatistics,
    /// Forget every alerted chat so they may alert again immediately.
    ClearNotifications,
    /// Correct the text of the active input field.
    ///
    /// `text` is what the page returned for `getAllTextFromActiveElement`.
    CorrectAllText {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    /// Ask whether a usable credential is configured.
    GetApiKey,
}

impl BackgroundRequest {
    /// Wire name of the request, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BackgroundRequest::ChatNeedsClosing { .. } => "CHAT_NEEDS_CLOSING",
            BackgroundRequest::GetSettings => "GET_SETTINGS",
            BackgroundRequest::UpdateSettings { .. } => "UPDATE_SETTINGS",
            BackgroundRequest::GetStatistics => "GET_STATISTICS",
            BackgroundRequest::ClearNotifications => "CLEAR_NOTIFICATIONS",
            BackgroundRequest::CorrectAllText { .. } => "CORRECT_ALL_TEXT",
            BackgroundRequest::GetApiKey => "GET_API_KEY",
        }
    }
}

/// Severity of an on-page notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// Commands sent from the background to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PageCommand {
    GetAllTextFromActiveElement,
    ReplaceAllTextInActiveElement { new_text: String },
    /// Transient, auto-dismissing notice rendered on the page.
    ShowNotification {
        message: String,
        #[serde(rename = "type")]
        kind: NoticeKind,
    },
}

impl PageCommand {
    pub fn notice(kind: NoticeKind, message: impl Into<String>) -> Self {
        PageCommand::ShowNotification {
            message: message.into(),
            kind,
        }
    }
}

/// Counters reported by `GET_STATISTICS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub active_notifications: usize,
    pub notified_chats_count: usize,
    pub is_enabled: bool,
}

/// An alert raised for a chat and not yet dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    /// `chat_<chatId>_<epoch ms>`
    pub id: String,
    pub chat_id: String,
    pub tab_id: TabId,
    pub url: String,
    pub age_minutes: i64,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Uniform response envelope; only the fields relevant to the request are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Statistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_api_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<PageCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackgroundResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_commands(mut self, commands: Vec<PageCommand>) -> Self {
        self.commands = commands;
        self
    }
}
