//! Alerts raised for inactive chats that have not been dismissed yet.

use chatwatch_types::{StoredNotification, TabId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct NotificationStore {
    by_id: HashMap<String, StoredNotification>,
}

impl NotificationStore {
    /// Store a new alert created at `timestamp_ms`. Ids stay unique when the
    /// same chat alerts on two tabs within one millisecond.
    pub fn create(
        &mut self,
        chat_id: &str,
        tab_id: TabId,
        url: &str,
        age_minutes: i64,
        mut timestamp_ms: i64,
    ) -> StoredNotification {
        while self.by_id.contains_key(&format!("chat_{chat_id}_{timestamp_ms}")) {
            timestamp_ms += 1;
        }
        let notification = StoredNotification {
            id: format!("chat_{chat_id}_{timestamp_ms}"),
            chat_id: chat_id.to_string(),
            tab_id,
            url: url.to_string(),
            age_minutes,
            timestamp: timestamp_ms,
        };
        self.by_id
            .insert(notification.id.clone(), notification.clone());
        notification
    }

    /// Oldest first.
    pub fn list(&self) -> Vec<StoredNotification> {
        let mut all: Vec<_> = self.by_id.values().cloned().collect();
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn dismiss(&mut self, id: &str) -> Option<StoredNotification> {
        self.by_id.remove(id)
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
