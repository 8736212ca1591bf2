//! Error types for chatwatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatwatchError {
    /// A chat row's id or timestamp could not be extracted.
    #[error("Parse error: {0}")]
    ParseFailure(String),

    #[error("No usable API key: {0}")]
    NoCredential(String),

    #[error("No text to correct")]
    NoText,

    /// The correction endpoint failed or answered with an unexpected shape.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The receiving side of a message channel is gone.
    #[error("Message channel closed")]
    ChannelInvalid,

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] chatwatch_types::SettingsError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
