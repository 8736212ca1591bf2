//! Record of chats already alerted, so an inactive chat alerts once per
//! cool-down window rather than on every poll.

use chatwatch_types::TabId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// How long an alerted chat stays silenced.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// A chat on a particular page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotifiedKey {
    pub chat_id: String,
    pub tab_id: TabId,
}

impl NotifiedKey {
    pub fn new(chat_id: impl Into<String>, tab_id: TabId) -> Self {
        Self {
            chat_id: chat_id.into(),
            tab_id,
        }
    }
}

/// Time-indexed set of alerted chats. Entries expire lazily on access.
#[derive(Debug)]
pub struct NotificationLedger {
    cooldown: Duration,
    marked: HashMap<NotifiedKey, Instant>,
}

impl Default for NotificationLedger {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl NotificationLedger {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            marked: HashMap::new(),
        }
    }

    /// Mark `key` as alerted at `now`.
    ///
    /// Returns `false` (and changes nothing) if it was already marked within
    /// the cool-down window.
    pub fn try_mark(&mut self, key: NotifiedKey, now: Instant) -> bool {
        self.purge_expired(now);
        if self.marked.contains_key(&key) {
            trace!(target: "chatwatch::alerts", "Suppressing repeat alert for chat {}", key.chat_id);
            return false;
        }
        self.marked.insert(key, now);
        true
    }

    /// Drop every entry whose cool-down has elapsed.
    pub fn purge_expired(&mut self, now: Instant) {
        let cooldown = self.cooldown;
        self.marked
            .retain(|_, marked_at| now.saturating_duration_since(*marked_at) < cooldown);
    }

    pub fn contains(&self, key: &NotifiedKey, now: Instant) -> bool {
        self.marked
            .get(key)
            .is_some_and(|marked_at| now.saturating_duration_since(*marked_at) < self.cooldown)
    }

    /// Number of chats currently silenced.
    pub fn len(&self, now: Instant) -> usize {
        self.marked
            .values()
            .filter(|marked_at| now.saturating_duration_since(**marked_at) < self.cooldown)
            .count()
    }

    pub fn is_empty(&self, now: Instant) -> bool {
        self.len(now) == 0
    }

    pub fn clear(&mut self) {
        self.marked.clear();
    }
}
