//! Read-only views of a chat-support page.
//!
//! The scanner and the phone extractor never touch a live page; they read a
//! [`DomSnapshot`]. [`HtmlSnapshot`] builds one from saved or fetched HTML.

use crate::{ChatwatchError, Result};
use scraper::{ElementRef, Html, Selector};

/// Chat rows are table cells whose id starts with this prefix.
pub const CHAT_ROW_SELECTOR: &str = r#"td[id^="name_"]"#;
const HEADING_SELECTOR: &str = ".panel-heading";
const MESSAGE_SELECTOR: &str =
    r#".message, .msg, .chat-message, [class*="message"], [class*="msg"]"#;
const EDITABLE_SELECTOR: &str = r#"textarea, input[type="text"], [contenteditable="true"]"#;
const ACTIVE_SELECTOR: &str = r#"textarea[autofocus], input[type="text"][autofocus]"#;

/// A chat row before its id and timestamp are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChatRow {
    /// Full `id` attribute, e.g. `name_123456`.
    pub element_id: String,
    /// Visible text of the row.
    pub text: String,
    /// Whether the row or its table row carries a pin marker.
    pub pinned: bool,
}

/// Queryable document as seen at one instant.
pub trait DomSnapshot {
    /// Page URL at snapshot time.
    fn url(&self) -> &str;

    /// Chat rows in document order.
    fn chat_rows(&self) -> Vec<RawChatRow>;

    /// Text of the panel headings.
    fn headings(&self) -> Vec<String>;

    /// Text of every chat message element.
    fn message_texts(&self) -> Vec<String>;

    /// Current contents of every editable field.
    fn editable_texts(&self) -> Vec<String>;

    /// Text of the field the operator is typing in, falling back to the
    /// first textarea and then the first text input.
    fn active_text(&self) -> Option<String>;

    /// All visible text of the page body.
    fn body_text(&self) -> String;
}

/// Compiled selectors, built once per snapshot.
struct Selectors {
    rows: Selector,
    headings: Selector,
    messages: Selector,
    editable: Selector,
    active: Selector,
    textarea: Selector,
    text_input: Selector,
    body: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ChatwatchError::Selector(format!("{css}: {e:?}")))
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            rows: selector(CHAT_ROW_SELECTOR)?,
            headings: selector(HEADING_SELECTOR)?,
            messages: selector(MESSAGE_SELECTOR)?,
            editable: selector(EDITABLE_SELECTOR)?,
            active: selector(ACTIVE_SELECTOR)?,
            textarea: selector("textarea")?,
            text_input: selector(r#"input[type="text"]"#)?,
            body: selector("body")?,
        })
    }
}

/// Snapshot backed by a parsed HTML document.
pub struct HtmlSnapshot {
    url: String,
    document: Html,
    selectors: Selectors,
}

impl HtmlSnapshot {
    /// Parse a full HTML document captured from `url`.
    pub fn parse(html: &str, url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            document: Html::parse_document(html),
            selectors: Selectors::new()?,
        })
    }

    fn is_pinned(row: ElementRef<'_>) -> bool {
        let marked = |el: ElementRef<'_>| {
            el.value().attr("data-pinned") == Some("true")
                || el.value().classes().any(|c| c == "pinned")
        };
        if marked(row) {
            return true;
        }
        row.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tr")
            .is_some_and(marked)
    }
}

/// Value of a form field: `value` for inputs, text content otherwise.
fn field_text(el: ElementRef<'_>) -> String {
    if el.value().name() == "input" {
        el.value().attr("value").unwrap_or_default().to_string()
    } else {
        el.text().collect()
    }
}

impl DomSnapshot for HtmlSnapshot {
    fn url(&self) -> &str {
        &self.url
    }

    fn chat_rows(&self) -> Vec<RawChatRow> {
        self.document
            .select(&self.selectors.rows)
            .map(|el| RawChatRow {
                element_id: el.value().attr("id").unwrap_or_default().to_string(),
                text: el.text().collect(),
                pinned: Self::is_pinned(el),
            })
            .collect()
    }

    fn headings(&self) -> Vec<String> {
        self.document
            .select(&self.selectors.headings)
            .map(|el| el.text().collect())
            .collect()
    }

    fn message_texts(&self) -> Vec<String> {
        self.document
            .select(&self.selectors.messages)
            .map(|el| el.text().collect())
            .collect()
    }

    fn editable_texts(&self) -> Vec<String> {
        self.document
            .select(&self.selectors.editable)
            .map(field_text)
            .collect()
    }

    fn active_text(&self) -> Option<String> {
        self.document
            .select(&self.selectors.active)
            .next()
            .or_else(|| self.document.select(&self.selectors.textarea).next())
            .or_else(|| self.document.select(&self.selectors.text_input).next())
            .map(field_text)
    }

    fn body_text(&self) -> String {
        self.document
            .select(&self.selectors.body)
            .next()
            .map(|body| body.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }
}
