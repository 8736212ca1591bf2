//! Chat list types produced by the page scanner.
//!
//! These records are rebuilt from the page on every poll and are never
//! persisted. They cross the content/background boundary as JSON.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of the chat list as seen on the page at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    /// Numeric chat id scraped from the row's `id` attribute.
    pub id: String,
    /// Pinned chats never raise inactivity alarms.
    pub is_pinned: bool,
    /// Time of the last message, `None` when the row text had no usable time.
    pub last_message_time: Option<NaiveDateTime>,
    /// Page URL at scan time.
    pub source_url: String,
}

impl ChatRecord {
    /// Whole minutes elapsed since the last message, if known.
    pub fn age_minutes(&self, now: NaiveDateTime) -> Option<i64> {
        self.last_message_time
            .map(|t| (now - t).num_milliseconds().div_euclid(60_000))
    }
}

/// Raised when an unpinned chat has been quiet for at least the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub chat_id: String,
    pub age_minutes: i64,
    pub url: String,
}

/// Visual state of a chat row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightState {
    /// Quiet for at least the threshold; rendered in red on the page.
    Stale,
    /// Recently active.
    Fresh,
}

/// Highlight decision for a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowHighlight {
    pub chat_id: String,
    pub age_minutes: i64,
    pub state: HighlightState,
}
