//! Polling page monitor.
//!
//! Each tick loads the page, scans the chat list and forwards alarms to the
//! coordinator. Content changes feed the re-scan debouncers, which extract
//! phone numbers from the latest page.

use crate::debounce::{DebounceWindows, RescanTriggers};
use crate::phone::{CanonicalPhone, PhoneExtractor};
use crate::scanner::{check_activity, detect_chat_interface, highlight, scan};
use crate::snapshot::{DomSnapshot, HtmlSnapshot};
use crate::{ChatwatchError, Result};
use chatwatch_types::{
    Alarm, BackgroundRequest, ChatRecord, HighlightState, RowHighlight, Settings, TabId,
};
use chrono::NaiveDateTime;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

/// Where the page HTML comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    File(PathBuf),
    Url(String),
}

impl SnapshotSource {
    /// `http://` and `https://` arguments are URLs, anything else a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            SnapshotSource::Url(arg.to_string())
        } else {
            SnapshotSource::File(PathBuf::from(arg))
        }
    }

    /// URL recorded on scanned chats.
    pub fn page_url(&self) -> String {
        match self {
            SnapshotSource::File(path) => format!("file://{}", path.display()),
            SnapshotSource::Url(url) => url.clone(),
        }
    }

    pub async fn load(&self, client: &Client) -> Result<String> {
        match self {
            SnapshotSource::File(path) => Ok(tokio::fs::read_to_string(path).await?),
            SnapshotSource::Url(url) => {
                let html = client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                Ok(html)
            }
        }
    }
}

/// Sending half of the monitor-to-coordinator channel.
#[derive(Debug, Clone)]
pub struct AlarmSink {
    tx: mpsc::Sender<BackgroundRequest>,
    tab_id: TabId,
}

impl AlarmSink {
    pub fn channel(capacity: usize, tab_id: TabId) -> (Self, mpsc::Receiver<BackgroundRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, tab_id }, rx)
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Forward an alarm as a `CHAT_NEEDS_CLOSING` request.
    pub async fn send(&self, alarm: &Alarm) -> Result<()> {
        let request = BackgroundRequest::ChatNeedsClosing {
            chat_id: alarm.chat_id.clone(),
            time_since_last_message: alarm.age_minutes,
            url: alarm.url.clone(),
            tab_id: self.tab_id,
        };
        self.tx
            .send(request)
            .await
            .map_err(|_| ChatwatchError::ChannelInvalid)
    }
}

/// What one inspection of the page found.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub interface_detected: bool,
    pub records: Vec<ChatRecord>,
    pub highlights: Vec<RowHighlight>,
    pub alarms: Vec<Alarm>,
    pub active_text: Option<String>,
}

/// Scan a page for the current settings. Never holds the parsed document
/// past its return.
pub fn inspect(html: &str, url: &str, now: NaiveDateTime, threshold: i64) -> Result<TickReport> {
    let snapshot = HtmlSnapshot::parse(html, url)?;
    if !detect_chat_interface(&snapshot) {
        return Ok(TickReport::default());
    }

    let records = scan(&snapshot, now);
    Ok(TickReport {
        interface_detected: true,
        highlights: highlight(&records, now, threshold),
        alarms: check_activity(&records, now, threshold),
        active_text: snapshot.active_text(),
        records,
    })
}

/// Phone numbers in the chat messages (or the whole body when the page has
/// no message elements) and in editable fields.
pub fn extract_page_phones(
    snapshot: &dyn DomSnapshot,
    extractor: &PhoneExtractor,
) -> BTreeSet<CanonicalPhone> {
    let messages = snapshot.message_texts();
    let mut phones = if messages.is_empty() {
        extractor.extract(&snapshot.body_text())
    } else {
        messages.iter().flat_map(|text| extractor.extract(text)).collect()
    };

    for field in snapshot.editable_texts() {
        phones.extend(extractor.extract(&field));
    }
    phones
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub windows: DebounceWindows,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            windows: DebounceWindows::default(),
        }
    }
}

/// Watches one page and reports inactive chats to the coordinator.
pub struct PageMonitor {
    source: SnapshotSource,
    page_url: String,
    client: Client,
    sink: AlarmSink,
    settings: watch::Receiver<Settings>,
    poll_interval: Duration,
    triggers: RescanTriggers,
    latest_html: Arc<Mutex<Option<String>>>,
    phones: Arc<Mutex<BTreeSet<CanonicalPhone>>>,
    last_digest: Option<Vec<u8>>,
    last_active: Option<String>,
}

impl PageMonitor {
    /// Create the monitor and its re-scan debouncers. Must be called from
    /// within a tokio runtime.
    pub fn new(
        source: SnapshotSource,
        sink: AlarmSink,
        settings: watch::Receiver<Settings>,
        extractor: Arc<PhoneExtractor>,
        config: MonitorConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        let page_url = source.page_url();
        let latest_html = Arc::new(Mutex::new(None::<String>));
        let phones = Arc::new(Mutex::new(BTreeSet::new()));

        let rescan = {
            let latest_html = latest_html.clone();
            let phones = phones.clone();
            let page_url = page_url.clone();
            Arc::new(move || {
                let html = latest_html
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                let Some(html) = html else {
                    return;
                };
                match HtmlSnapshot::parse(&html, page_url.as_str()) {
                    Ok(snapshot) => {
                        let found = extract_page_phones(&snapshot, &extractor);
                        if !found.is_empty() {
                            let rendered: Vec<String> =
                                found.iter().map(|p| extractor.render(p)).collect();
                            info!(
                                target: "chatwatch::phones",
                                "Found {} phone number(s): {}",
                                found.len(),
                                rendered.join(", ")
                            );
                        }
                        *phones.lock().unwrap_or_else(PoisonError::into_inner) = found;
                    }
                    Err(e) => warn!(target: "chatwatch::phones", "Re-scan failed: {}", e),
                }
            }) as Arc<dyn Fn() + Send + Sync>
        };

        Ok(Self {
            source,
            page_url,
            client,
            sink,
            settings,
            poll_interval: config.poll_interval,
            triggers: RescanTriggers::spawn(config.windows, rescan),
            latest_html,
            phones,
            last_digest: None,
            last_active: None,
        })
    }

    /// Phone numbers found by the most recent re-scan.
    pub fn phones(&self) -> BTreeSet<CanonicalPhone> {
        self.phones
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load the page once and process it.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Result<TickReport> {
        let html = self.source.load(&self.client).await?;
        self.observe(&html, now).await
    }

    /// Process one copy of the page.
    pub async fn observe(&mut self, html: &str, now: NaiveDateTime) -> Result<TickReport> {
        let threshold = i64::from(self.settings.borrow().notification_interval);
        let report = inspect(html, &self.page_url, now, threshold)?;

        if report.interface_detected {
            trace!(
                target: "chatwatch::monitor",
                "{} chats, {} over {} min",
                report.records.len(),
                report.alarms.len(),
                threshold
            );
            for row in report
                .highlights
                .iter()
                .filter(|h| h.state == HighlightState::Stale)
            {
                debug!(
                    target: "chatwatch::monitor",
                    "Stale chat {} ({} min)",
                    row.chat_id,
                    row.age_minutes
                );
            }
            for alarm in &report.alarms {
                self.sink.send(alarm).await?;
            }
        } else {
            trace!(target: "chatwatch::monitor", "No chat interface on {}", self.page_url);
        }

        self.feed_triggers(html, report.active_text.as_deref())?;
        Ok(report)
    }

    fn feed_triggers(&mut self, html: &str, active_text: Option<&str>) -> Result<()> {
        let digest = Sha256::digest(html.as_bytes()).to_vec();
        if self.last_digest.as_ref() != Some(&digest) {
            *self
                .latest_html
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(html.to_string());
            self.last_digest = Some(digest);
            self.triggers.mutation.trigger()?;
        }

        match (self.last_active.as_deref(), active_text) {
            (None, Some(_)) => self.triggers.focus.trigger()?,
            (Some(before), Some(after)) if before != after => self.triggers.input.trigger()?,
            _ => {}
        }
        self.last_active = active_text.map(str::to_string);
        Ok(())
    }

    /// Poll until the coordinator goes away.
    pub async fn run(mut self) {
        info!(
            target: "chatwatch::monitor",
            "Monitoring {} every {:?}",
            self.page_url,
            self.poll_interval
        );
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            let now = chrono::Local::now().naive_local();
            match self.tick(now).await {
                Ok(report) => {
                    if !report.alarms.is_empty() {
                        debug!(
                            target: "chatwatch::monitor",
                            "Reported {} inactive chat(s)",
                            report.alarms.len()
                        );
                    }
                }
                Err(ChatwatchError::ChannelInvalid) => {
                    warn!(target: "chatwatch::monitor", "Coordinator channel closed, stopping monitor");
                    return;
                }
                Err(e) => warn!(target: "chatwatch::monitor", "Tick failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn page(draft: &str) -> String {
        format!(
            r#"<html><body>
              <div class="panel-heading">Диалог не прикреплен</div>
              <table>
                <tr><td id="name_1">Клиент 10:25</td></tr>
                <tr><td id="name_2">Клиент 10:00</td></tr>
                <tr class="pinned"><td id="name_3">Клиент 08:00</td></tr>
              </table>
              <div class="message">Мой номер +7 (700) 707-77-77</div>
              <textarea autofocus>{draft}</textarea>
            </body></html>"#
        )
    }

    fn monitor(source: SnapshotSource) -> (PageMonitor, mpsc::Receiver<BackgroundRequest>) {
        let (sink, rx) = AlarmSink::channel(16, 7);
        let (_tx, settings) = watch::channel(Settings::default());
        let monitor = PageMonitor::new(
            source,
            sink,
            settings,
            Arc::new(PhoneExtractor::default()),
            MonitorConfig::default(),
        )
        .unwrap();
        (monitor, rx)
    }

    #[test]
    fn test_source_from_arg() {
        assert_eq!(
            SnapshotSource::from_arg("https://crm.example/chats"),
            SnapshotSource::Url("https://crm.example/chats".into())
        );
        assert_eq!(
            SnapshotSource::from_arg("pages/chats.html"),
            SnapshotSource::File(PathBuf::from("pages/chats.html"))
        );
    }

    #[test]
    fn test_inspect_without_interface() {
        let report = inspect("<html><body><p>hello</p></body></html>", "u", now(), 20).unwrap();
        assert!(!report.interface_detected);
        assert!(report.records.is_empty());
    }

    #[test]
    fn test_extract_page_phones_falls_back_to_body() {
        let extractor = PhoneExtractor::default();
        let snapshot = HtmlSnapshot::parse(
            "<html><body><p>Звоните 87077777777</p><input type=\"text\" value=\"7000000000\"></body></html>",
            "u",
        )
        .unwrap();
        let phones: Vec<String> = extract_page_phones(&snapshot, &extractor)
            .iter()
            .map(|p| p.digits().to_string())
            .collect();
        assert_eq!(phones, vec!["7000000000", "7077777777"]);
    }

    #[tokio::test]
    async fn test_tick_from_file_reports_stale_chat() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chats.html");
        std::fs::write(&file, page("")).unwrap();

        let (mut monitor, mut rx) = monitor(SnapshotSource::File(file));
        let report = monitor.tick(now()).await.unwrap();
        assert!(report.interface_detected);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.alarms.len(), 1);

        match rx.recv().await.unwrap() {
            BackgroundRequest::ChatNeedsClosing {
                chat_id,
                time_since_last_message,
                tab_id,
                url,
            } => {
                assert_eq!(chat_id, "2");
                assert_eq!(time_since_last_message, 30);
                assert_eq!(tab_id, 7);
                assert!(url.starts_with("file://"));
            }
            other => panic!("unexpected request {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tick_from_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chats"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page("")))
            .mount(&server)
            .await;

        let (mut monitor, _rx) = monitor(SnapshotSource::Url(format!("{}/chats", server.uri())));
        let report = monitor.tick(now()).await.unwrap();
        assert_eq!(report.alarms.len(), 1);
        assert_eq!(report.alarms[0].url, format!("{}/chats", server.uri()));
    }

    #[tokio::test]
    async fn test_closed_sink_is_channel_invalid() {
        let (mut monitor, rx) = monitor(SnapshotSource::from_arg("unused.html"));
        drop(rx);
        assert!(matches!(
            monitor.observe(&page(""), now()).await,
            Err(ChatwatchError::ChannelInvalid)
        ));
    }

    #[tokio::test]
    async fn test_threshold_follows_settings() {
        let (sink, mut rx) = AlarmSink::channel(16, 0);
        let (tx, settings) = watch::channel(Settings::default());
        let mut monitor = PageMonitor::new(
            SnapshotSource::from_arg("unused.html"),
            sink,
            settings,
            Arc::new(PhoneExtractor::default()),
            MonitorConfig::default(),
        )
        .unwrap();

        tx.send_modify(|s| s.notification_interval = 5);
        let report = monitor.observe(&page(""), now()).await.unwrap();
        assert_eq!(report.alarms.len(), 2);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_change_rescans_phones() {
        let (mut monitor, _rx) = monitor(SnapshotSource::from_arg("unused.html"));
        monitor.observe(&page(""), now()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let digits: Vec<String> = monitor.phones().iter().map(|p| p.digits().to_string()).collect();
        assert_eq!(digits, vec!["7007077777"]);

        monitor
            .observe(&page("перезвоните на 8 747 123 45 67"), now())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(monitor.phones().len(), 2);
    }
}
