//! Chat scanning, phone normalization, alert bookkeeping and text correction
//! for Chatwatch.

mod corrector;
mod debounce;
mod error;
mod ledger;
mod monitor;
mod phone;
mod scanner;
mod snapshot;
mod timestamp;

pub use corrector::{
    correct_page_text, validate_api_key, CorrectionOutcome, GeminiCorrector, TextCorrector,
    DEFAULT_BASE_URL, DEFAULT_MODEL, MIN_API_KEY_LEN,
};
pub use debounce::{DebounceWindows, Debouncer, RescanTriggers};
pub use error::ChatwatchError;
pub use ledger::{NotificationLedger, NotifiedKey, DEFAULT_COOLDOWN};
pub use monitor::{
    extract_page_phones, inspect, AlarmSink, MonitorConfig, PageMonitor, SnapshotSource,
    TickReport,
};
pub use phone::{
    CanonicalPhone, PhoneExtractor, PhoneFormat, PhonePattern, Rewrite, DEFAULT_AREA_CODES,
};
pub use scanner::{check_activity, detect_chat_interface, highlight, parse_row, scan};
pub use snapshot::{DomSnapshot, HtmlSnapshot, RawChatRow, CHAT_ROW_SELECTOR};
pub use timestamp::{parse_message_time, resolve_clock};

/// Result type for Chatwatch operations.
pub type Result<T> = std::result::Result<T, ChatwatchError>;
