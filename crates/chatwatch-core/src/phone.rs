//! Phone number extraction and normalization.
//!
//! Numbers are recognised by a table of independent patterns, one per written
//! convention (`87007077777`, `+7 700 707 77 77`, `8(700)707-77-77`, ...).
//! Every accepted match is reduced to its 10-digit subscriber number, so the
//! same number written any supported way collapses to one [`CanonicalPhone`].

use crate::{ChatwatchError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

/// Mobile operator codes accepted as the start of a subscriber number.
pub const DEFAULT_AREA_CODES: [&str; 8] = ["707", "700", "747", "708", "727", "775", "778", "706"];

/// Digits in a subscriber number without country or trunk prefix.
const SUBSCRIBER_LEN: usize = 10;
/// Longest digit run accepted from a single match.
const MAX_CANDIDATE_LEN: usize = 12;

/// How a canonical number is written back out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneFormat {
    /// `700 707 77 77`
    #[default]
    Compact,
    /// `+7 700 707 77 77`
    International,
}

impl std::str::FromStr for PhoneFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(PhoneFormat::Compact),
            "international" => Ok(PhoneFormat::International),
            _ => Err(format!(
                "Invalid phone format: '{}'. Use 'compact' or 'international'.",
                s
            )),
        }
    }
}

/// A validated 10-digit subscriber number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalPhone {
    digits: String,
}

impl CanonicalPhone {
    /// Digits only, as copied to the clipboard.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// `AAA BBB CC DD` groups.
    fn groups(&self) -> [&str; 4] {
        let d = self.digits.as_str();
        [&d[..3], &d[3..6], &d[6..8], &d[8..10]]
    }

    pub fn render(&self, format: PhoneFormat) -> String {
        let grouped = self.groups().join(" ");
        match format {
            PhoneFormat::Compact => grouped,
            PhoneFormat::International => format!("+7 {grouped}"),
        }
    }
}

impl fmt::Display for CanonicalPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(PhoneFormat::Compact))
    }
}

/// One entry of the recognition table.
#[derive(Debug, Clone)]
pub struct PhonePattern {
    pub name: &'static str,
    pub regex: Regex,
}

/// Outcome of rewriting one number throughout a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// Raw occurrences replaced; occurrences already canonical are not counted.
    pub replacements: usize,
}

/// Finds, normalizes and rewrites phone numbers.
#[derive(Debug, Clone)]
pub struct PhoneExtractor {
    area_codes: Vec<String>,
    patterns: Vec<PhonePattern>,
    format: PhoneFormat,
}

impl Default for PhoneExtractor {
    fn default() -> Self {
        Self::new(&DEFAULT_AREA_CODES, PhoneFormat::default())
            .expect("default area codes are valid")
    }
}

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Word boundary that only treats ASCII letters and digits as word characters,
/// so a number glued to Cyrillic text (`номер87007077777`) still stands alone.
const ASCII_BOUNDARY: &str = r"(?-u:\b)";

/// Table of `(name, pattern)` pairs; `{C}` stands for the area-code
/// alternation and `{B}` for [`ASCII_BOUNDARY`].
const PATTERN_TABLE: [(&str, &str); 9] = [
    ("seven_prefixed", r"{B}7(?:{C})[0-9]{7}{B}"),
    ("eight_prefixed", r"{B}8(?:{C})[0-9]{7}{B}"),
    ("plus_seven", r"\+7\s*(?:{C})\s*[0-9]{3}\s*[0-9]{2}\s*[0-9]{2}{B}"),
    (
        "space_separated",
        r"{B}[78]\s+(?:{C})\s+[0-9]{3}\s+[0-9]{2}\s+[0-9]{2}{B}",
    ),
    ("hyphen_separated", r"{B}[78]-(?:{C})-[0-9]{3}-[0-9]{2}-[0-9]{2}{B}"),
    ("dot_separated", r"{B}[78]\.(?:{C})\.[0-9]{3}\.[0-9]{2}\.[0-9]{2}{B}"),
    (
        "parenthesized",
        r"{B}[78]\(?(?:{C})\)?[\s-]?[0-9]{3}[\s-]?[0-9]{2}[\s-]?[0-9]{2}{B}",
    ),
    ("bare_subscriber", r"{B}(?:{C})[0-9]{7}{B}"),
    (
        "mixed_separators",
        r"{B}[78][\s\-().]*?(?:{C})[\s\-().]*?[0-9]{3}[\s\-().]*?[0-9]{2}[\s\-().]*?[0-9]{2}{B}",
    ),
];

impl PhoneExtractor {
    /// Build an extractor accepting only numbers that start with one of `area_codes`.
    pub fn new<S: AsRef<str>>(area_codes: &[S], format: PhoneFormat) -> Result<Self> {
        let area_codes: Vec<String> = area_codes.iter().map(|c| c.as_ref().to_string()).collect();
        if area_codes.is_empty() {
            return Err(ChatwatchError::InvalidConfig(
                "at least one area code is required".into(),
            ));
        }
        if let Some(bad) = area_codes
            .iter()
            .find(|c| c.len() != 3 || !c.chars().all(|ch| ch.is_ascii_digit()))
        {
            return Err(ChatwatchError::InvalidConfig(format!(
                "area code '{bad}' is not three digits"
            )));
        }

        let alternation = area_codes.join("|");
        let patterns = PATTERN_TABLE
            .iter()
            .map(|(name, template)| {
                let source = template
                    .replace("{C}", &alternation)
                    .replace("{B}", ASCII_BOUNDARY);
                Regex::new(&source)
                    .map(|regex| PhonePattern { name, regex })
                    .map_err(|e| ChatwatchError::InvalidConfig(format!("pattern {name}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            area_codes,
            patterns,
            format,
        })
    }

    pub fn format(&self) -> PhoneFormat {
        self.format
    }

    pub fn patterns(&self) -> &[PhonePattern] {
        &self.patterns
    }

    /// Canonical form as configured for display and replacement.
    pub fn render(&self, phone: &CanonicalPhone) -> String {
        phone.render(self.format)
    }

    /// Whether a candidate digit run has a plausible length and a known code
    /// right after its country/trunk digit (or at the start, for 10 digits).
    fn is_candidate(&self, digits: &str) -> bool {
        (SUBSCRIBER_LEN..=MAX_CANDIDATE_LEN).contains(&digits.len())
            && self.area_codes.iter().any(|code| {
                digits
                    .strip_prefix(['7', '8'])
                    .is_some_and(|rest| rest.starts_with(code.as_str()))
                    || (digits.len() == SUBSCRIBER_LEN && digits.starts_with(code.as_str()))
            })
    }

    /// Every distinct phone number in `text`.
    pub fn extract(&self, text: &str) -> BTreeSet<CanonicalPhone> {
        let mut found = BTreeSet::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                let digits = digits_of(m.as_str());
                if !self.is_candidate(&digits) {
                    continue;
                }
                if let Some(phone) = self.normalize(&digits) {
                    trace!(
                        target: "chatwatch::phones",
                        "{} matched '{}' -> {}",
                        pattern.name,
                        m.as_str(),
                        phone
                    );
                    found.insert(phone);
                }
            }
        }
        found
    }

    /// Reduce a raw number to its subscriber digits.
    ///
    /// Only the digit sequence matters: ten digits are the subscriber number,
    /// longer runs carry a country (`7`) or trunk (`8`) prefix and keep their
    /// last ten. Fewer than ten digits or an unknown code give `None`.
    pub fn normalize(&self, raw: &str) -> Option<CanonicalPhone> {
        let digits = digits_of(raw);
        let subscriber = match digits.len() {
            0..SUBSCRIBER_LEN => return None,
            SUBSCRIBER_LEN => digits.as_str(),
            len => &digits[len - SUBSCRIBER_LEN..],
        };
        self.area_codes
            .iter()
            .any(|code| subscriber.starts_with(code.as_str()))
            .then(|| CanonicalPhone {
                digits: subscriber.to_string(),
            })
    }

    /// Rendered canonical form, or `raw` unchanged when it is not a valid number.
    pub fn normalize_lossy(&self, raw: &str) -> String {
        self.normalize(raw)
            .map(|phone| self.render(&phone))
            .unwrap_or_else(|| raw.to_string())
    }

    /// Pattern sources for every raw spelling of `phone`, longest prefix first.
    fn variant_sources(phone: &CanonicalPhone) -> Vec<String> {
        let d = phone.digits();
        let [a, b, c, e] = phone.groups();
        let w = ASCII_BOUNDARY;
        vec![
            format!(r"\+7\s*{a}\s*{b}\s*{c}\s*{e}{w}"),
            format!(r"\+7{d}{w}"),
            format!(r"{w}8\({a}\){b}-{c}-{e}{w}"),
            format!(r"{w}8-{a}-{b}-{c}-{e}{w}"),
            format!(r"{w}8\s*{a}\s*{b}\s*{c}\s*{e}{w}"),
            format!(r"{w}8{d}{w}"),
            format!(r"{w}7\s*{a}\s*{b}\s*{c}\s*{e}{w}"),
            format!(r"{w}{d}{w}"),
        ]
    }

    /// Regexes matching each raw way `phone` may have been written.
    pub fn variants_of(&self, phone: &CanonicalPhone) -> Vec<Regex> {
        Self::variant_sources(phone)
            .iter()
            .filter_map(|source| Regex::new(source).ok())
            .collect()
    }

    /// Replace every raw spelling of `phone` in `text` with its canonical form.
    ///
    /// All variants run as one alternation in a single left-to-right pass, so
    /// each occurrence is replaced once and replaced text is never rescanned.
    pub fn rewrite(&self, text: &str, phone: &CanonicalPhone) -> Result<Rewrite> {
        let alternation = Self::variant_sources(phone)
            .iter()
            .map(|source| format!("(?:{source})"))
            .collect::<Vec<_>>()
            .join("|");
        let combined = Regex::new(&alternation)
            .map_err(|e| ChatwatchError::InvalidConfig(format!("variant pattern: {e}")))?;

        let canonical = self.render(phone);
        let mut replacements = 0;
        let rewritten = combined.replace_all(text, |caps: &Captures| {
            if &caps[0] != canonical {
                replacements += 1;
            }
            canonical.clone()
        });

        Ok(Rewrite {
            text: rewritten.into_owned(),
            replacements,
        })
    }
}
