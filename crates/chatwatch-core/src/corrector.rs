//! Grammar correction through the Gemini `generateContent` endpoint.

use crate::{ChatwatchError, Result};
use async_trait::async_trait;
use chatwatch_types::{NoticeKind, PageCommand};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Shortest string accepted as an API key.
pub const MIN_API_KEY_LEN: usize = 30;
/// Value shipped in the sample config; never a real key.
const PLACEHOLDER_KEY: &str = "ВСТАВЬТЕ_ВАШ_API_КЛЮЧ_СЮДА";

const PROMPT: &str = "Исправь грамматические ошибки, пунктуацию и стиль в следующем тексте. \
                      Верни только исправленный текст без дополнительных комментариев:";

const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.1;

/// Check that a credential is present and plausible.
pub fn validate_api_key(key: Option<&str>) -> Result<String> {
    let key = key.map(str::trim).unwrap_or_default();
    if key.is_empty() || key == PLACEHOLDER_KEY {
        return Err(ChatwatchError::NoCredential("API key is not configured".into()));
    }
    if key.chars().count() < MIN_API_KEY_LEN {
        return Err(ChatwatchError::NoCredential(format!(
            "API key is too short ({} characters)",
            key.chars().count()
        )));
    }
    Ok(key.to_string())
}

/// Something that can return a corrected version of a text.
#[async_trait]
pub trait TextCorrector: Send + Sync {
    async fn correct(&self, text: &str, api_key: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Gemini HTTP client.
pub struct GeminiCorrector {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiCorrector {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextCorrector for GeminiCorrector {
    async fn correct(&self, text: &str, api_key: &str) -> Result<String> {
        let prompt = format!("{PROMPT}\n\n{text}");
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            },
        };

        debug!(
            target: "chatwatch::corrector",
            "Requesting correction: model={}, {} chars",
            self.model,
            text.chars().count()
        );

        // the key travels in the query string; strip URLs from transport errors
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatwatchError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatwatchError::Http(e.without_url()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(e) => e.error.message,
                Err(_) => format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("unknown status")
                ),
            };
            warn!(target: "chatwatch::corrector", "Correction failed: {}", message);
            return Err(ChatwatchError::Upstream(message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ChatwatchError::Upstream(format!("unreadable response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .ok_or_else(|| ChatwatchError::Upstream("unexpected response shape".into()))
    }
}

/// Result of a full "correct all text" round: the page commands to apply and
/// the corrected text on success.
#[derive(Debug)]
pub struct CorrectionOutcome {
    pub commands: Vec<PageCommand>,
    pub result: Result<String>,
}

/// Run the correction flow for the active field's text.
///
/// `request_key` takes precedence over `configured_key`. Every failure is
/// also reported as an error notice so the page can show it.
pub async fn correct_page_text(
    corrector: &dyn TextCorrector,
    request_key: Option<&str>,
    configured_key: Option<&str>,
    text: Option<&str>,
) -> CorrectionOutcome {
    let key = match validate_api_key(request_key.filter(|k| !k.trim().is_empty()).or(configured_key)) {
        Ok(key) => key,
        Err(e) => {
            return CorrectionOutcome {
                commands: vec![PageCommand::notice(
                    NoticeKind::Error,
                    "Необходимо настроить Gemini API ключ в панели расширения",
                )],
                result: Err(e),
            };
        }
    };

    let text = match text.filter(|t| !t.trim().is_empty()) {
        Some(text) => text,
        None => {
            return CorrectionOutcome {
                commands: vec![PageCommand::notice(
                    NoticeKind::Error,
                    "Нет текста для исправления в активном элементе",
                )],
                result: Err(ChatwatchError::NoText),
            };
        }
    };

    let mut commands = vec![PageCommand::notice(
        NoticeKind::Info,
        "Обрабатываю текст с помощью ИИ…",
    )];

    match corrector.correct(text, &key).await {
        Ok(corrected) => {
            info!(target: "chatwatch::corrector", "Text corrected ({} chars)", corrected.chars().count());
            commands.push(PageCommand::ReplaceAllTextInActiveElement {
                new_text: corrected.clone(),
            });
            commands.push(PageCommand::notice(NoticeKind::Success, "Готово! Текст исправлен"));
            CorrectionOutcome {
                commands,
                result: Ok(corrected),
            }
        }
        Err(e) => {
            commands.push(PageCommand::notice(NoticeKind::Error, format!("Ошибка API: {e}")));
            CorrectionOutcome {
                commands,
                result: Err(e),
            }
        }
    }
}
