//! Chat list scanning and inactivity checks.
//!
//! `scan` turns a page snapshot into [`ChatRecord`]s; `check_activity` and
//! `highlight` are pure functions of those records and the current time.

use crate::snapshot::{DomSnapshot, RawChatRow};
use crate::timestamp::parse_message_time;
use crate::{ChatwatchError, Result};
use chatwatch_types::{Alarm, ChatRecord, HighlightState, RowHighlight};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

static CHAT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"name_([0-9]+)").expect("valid chat id pattern"));

/// Heading labels shown only on the chat operator interface.
const INTERFACE_MARKERS: [&str; 2] = ["Диалог прикреплен", "Диалог не прикреплен"];

/// Interpret one raw row. Fails only when the id is unusable; a missing time
/// still yields a record.
pub fn parse_row(row: &RawChatRow, url: &str, now: NaiveDateTime) -> Result<ChatRecord> {
    let id = CHAT_ID
        .captures(&row.element_id)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ChatwatchError::ParseFailure(format!("bad chat id '{}'", row.element_id)))?;

    Ok(ChatRecord {
        id,
        is_pinned: row.pinned,
        last_message_time: parse_message_time(&row.text, now),
        source_url: url.to_string(),
    })
}

/// Extract every chat row on the page, in document order.
///
/// Rows with an unusable id are skipped. An empty page is not an error.
pub fn scan(snapshot: &dyn DomSnapshot, now: NaiveDateTime) -> Vec<ChatRecord> {
    let url = snapshot.url();
    let rows = snapshot.chat_rows();
    trace!(target: "chatwatch::scanner", "Found {} chat rows", rows.len());

    rows.iter()
        .filter_map(|row| match parse_row(row, url, now) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(target: "chatwatch::scanner", "Skipping row: {}", e);
                None
            }
        })
        .collect()
}

/// Alarms for unpinned chats quiet for at least `threshold_minutes`.
pub fn check_activity(
    records: &[ChatRecord],
    now: NaiveDateTime,
    threshold_minutes: i64,
) -> Vec<Alarm> {
    records
        .iter()
        .filter(|record| !record.is_pinned)
        .filter_map(|record| {
            let age_minutes = record.age_minutes(now)?;
            (age_minutes >= threshold_minutes).then(|| Alarm {
                chat_id: record.id.clone(),
                age_minutes,
                url: record.source_url.clone(),
            })
        })
        .collect()
}

/// Colour decision for every row with a known time. Pinned rows are
/// highlighted too; only alarms exempt them.
pub fn highlight(
    records: &[ChatRecord],
    now: NaiveDateTime,
    threshold_minutes: i64,
) -> Vec<RowHighlight> {
    records
        .iter()
        .filter_map(|record| {
            let age_minutes = record.age_minutes(now)?;
            let state = if age_minutes >= threshold_minutes {
                HighlightState::Stale
            } else {
                HighlightState::Fresh
            };
            Some(RowHighlight {
                chat_id: record.id.clone(),
                age_minutes,
                state,
            })
        })
        .collect()
}

/// Whether the snapshot looks like the operator chat interface.
pub fn detect_chat_interface(snapshot: &dyn DomSnapshot) -> bool {
    snapshot
        .headings()
        .iter()
        .any(|h| INTERFACE_MARKERS.iter().any(|marker| h.contains(marker)))
        || !snapshot.chat_rows().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::HtmlSnapshot;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record(id: &str, pinned: bool, time: Option<NaiveDateTime>) -> ChatRecord {
        ChatRecord {
            id: id.into(),
            is_pinned: pinned,
            last_message_time: time,
            source_url: "https://support.example/chats".into(),
        }
    }

    struct FakeSnapshot {
        rows: Vec<RawChatRow>,
        headings: Vec<String>,
    }

    impl DomSnapshot for FakeSnapshot {
        fn url(&self) -> &str {
            "https://support.example/chats"
        }
        fn chat_rows(&self) -> Vec<RawChatRow> {
            self.rows.clone()
        }
        fn headings(&self) -> Vec<String> {
            self.headings.clone()
        }
        fn message_texts(&self) -> Vec<String> {
            Vec::new()
        }
        fn editable_texts(&self) -> Vec<String> {
            Vec::new()
        }
        fn active_text(&self) -> Option<String> {
            None
        }
        fn body_text(&self) -> String {
            String::new()
        }
    }

    fn raw(id: &str, text: &str) -> RawChatRow {
        RawChatRow {
            element_id: id.into(),
            text: text.into(),
            pinned: false,
        }
    }

    #[test]
    fn test_scan_skips_malformed_rows() {
        let snapshot = FakeSnapshot {
            rows: vec![
                raw("name_1", "Клиент 10:00"),
                raw("name_", "Без номера 10:00"),
                raw("name_3", "Без времени"),
            ],
            headings: vec![],
        };
        let records = scan(&snapshot, at(21, 10, 30));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].last_message_time, Some(at(21, 10, 0)));
        assert_eq!(records[1].id, "3");
        assert_eq!(records[1].last_message_time, None);
    }

    #[test]
    fn test_scan_empty_page() {
        let snapshot = FakeSnapshot {
            rows: vec![],
            headings: vec![],
        };
        assert!(scan(&snapshot, at(21, 10, 0)).is_empty());
    }

    #[test]
    fn test_scan_html_page() {
        let html = r#"<table>
            <tr><td id="name_555">Гульнара 23:55</td></tr>
            <tr data-pinned="true"><td id="name_556">Марат 23:50</td></tr>
        </table>"#;
        let snapshot = HtmlSnapshot::parse(html, "https://support.example/chats").unwrap();
        let records = scan(&snapshot, at(22, 0, 10));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].last_message_time, Some(at(21, 23, 55)));
        assert!(records[1].is_pinned);
        assert_eq!(records[0].source_url, "https://support.example/chats");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let now = at(21, 12, 0);
        let records = vec![
            record("exact", false, Some(at(21, 11, 40))),
            record("under", false, Some(at(21, 11, 41))),
        ];
        let alarms = check_activity(&records, now, 20);
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].chat_id, "exact");
        assert_eq!(alarms[0].age_minutes, 20);
        assert_eq!(alarms[0].url, "https://support.example/chats");
    }

    #[test]
    fn test_pinned_never_alarms() {
        let now = at(21, 12, 0);
        let records = vec![record("pinned", true, Some(at(20, 8, 0)))];
        assert!(check_activity(&records, now, 20).is_empty());
        // but it is still highlighted
        let rows = highlight(&records, now, 20);
        assert_eq!(rows[0].state, HighlightState::Stale);
    }

    #[test]
    fn test_unknown_time_never_alarms() {
        let records = vec![record("x", false, None)];
        assert!(check_activity(&records, at(21, 12, 0), 0).is_empty());
        assert!(highlight(&records, at(21, 12, 0), 0).is_empty());
    }

    #[test]
    fn test_midnight_age() {
        let now = at(22, 0, 10);
        let snapshot = FakeSnapshot {
            rows: vec![raw("name_9", "Ночной клиент 23:55")],
            headings: vec![],
        };
        let records = scan(&snapshot, now);
        let alarms = check_activity(&records, now, 15);
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].age_minutes, 15);
    }

    #[test]
    fn test_highlight_states() {
        let now = at(21, 12, 0);
        let records = vec![
            record("old", false, Some(at(21, 11, 0))),
            record("new", false, Some(at(21, 11, 59))),
        ];
        let rows = highlight(&records, now, 18);
        assert_eq!(rows[0].state, HighlightState::Stale);
        assert_eq!(rows[0].age_minutes, 60);
        assert_eq!(rows[1].state, HighlightState::Fresh);
    }

    #[test]
    fn test_detect_chat_interface() {
        let by_heading = FakeSnapshot {
            rows: vec![],
            headings: vec!["  Диалог прикреплен  ".into()],
        };
        assert!(detect_chat_interface(&by_heading));

        let by_rows = FakeSnapshot {
            rows: vec![raw("name_1", "")],
            headings: vec![],
        };
        assert!(detect_chat_interface(&by_rows));

        let neither = FakeSnapshot {
            rows: vec![],
            headings: vec!["Настройки".into()],
        };
        assert!(!detect_chat_interface(&neither));
    }
}
