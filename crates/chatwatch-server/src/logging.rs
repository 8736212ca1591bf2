//! Logging configuration and initialization.
//!
//! Presets pick per-target levels for the `chatwatch::*` targets; `--log`
//! overrides single targets and `RUST_LOG` replaces the whole filter.

use std::collections::HashMap;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const TARGET_PREFIX: &str = "chatwatch::";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Alerts, settings changes and startup only
    #[default]
    Production,
    Verbose,
    Debug,
    /// Includes per-row scanner and debounce timer output
    Trace,
    /// Warnings and errors only
    Quiet,
}

impl LogPreset {
    /// Most specific flag wins: quiet, then trace, debug, verbose.
    pub fn from_flags(verbose: bool, debug: bool, trace: bool, quiet: bool) -> Self {
        if quiet {
            LogPreset::Quiet
        } else if trace {
            LogPreset::Trace
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        }
    }

    fn directives(self) -> &'static [&'static str] {
        match self {
            LogPreset::Production => &[
                "chatwatch::startup=info",
                "chatwatch::api=info",
                "chatwatch::alerts=info",
                "chatwatch::settings=info",
                "chatwatch::corrector=info",
                "chatwatch::monitor=info",
                "chatwatch::phones=info",
                "chatwatch::scanner=warn",
                "chatwatch::debounce=off",
                "tower_http=warn",
            ],
            LogPreset::Verbose => &["chatwatch=info", "chatwatch::debounce=off", "tower_http=info"],
            LogPreset::Debug => &["chatwatch=debug", "chatwatch::debounce=off", "tower_http=debug"],
            LogPreset::Trace => &["chatwatch=trace", "tower_http=trace"],
            LogPreset::Quiet => &["chatwatch=warn", "tower_http=error"],
        }
    }
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Full target name to level, e.g. `chatwatch::scanner` -> DEBUG
    pub overrides: HashMap<String, Level>,
    pub format: LogFormat,
}

/// Parse one `target=level` pair. Short targets get the `chatwatch::` prefix.
fn parse_override(part: &str) -> Option<(String, Level)> {
    let (target, level) = part.split_once('=')?;
    let target = target.trim();
    let level = match level.trim().to_lowercase().as_str() {
        "warning" => Level::WARN,
        other => other.parse::<Level>().ok()?,
    };

    let target = if target.starts_with(TARGET_PREFIX) || target == "tower_http" {
        target.to_string()
    } else {
        format!("{TARGET_PREFIX}{target}")
    };
    Some((target, level))
}

impl LogConfig {
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: Vec<String>,
        format: LogFormat,
    ) -> Self {
        // each flag value may hold several comma-separated pairs
        let overrides = log_overrides
            .iter()
            .flat_map(|arg| arg.split(','))
            .filter_map(parse_override)
            .collect();

        Self {
            preset: LogPreset::from_flags(verbose, debug, trace, quiet),
            overrides,
            format,
        }
    }

    /// Filter directives for this configuration, overrides last.
    pub fn directives(&self) -> String {
        let mut directives: Vec<String> =
            self.preset.directives().iter().map(|d| d.to_string()).collect();
        for (target, level) in &self.overrides {
            directives.push(format!("{}={}", target, level.to_string().to_lowercase()));
        }
        directives.join(",")
    }

    /// `RUST_LOG` when set, otherwise the preset plus overrides.
    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        EnvFilter::try_new(self.directives()).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize the tracing subscriber with the given configuration.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_thread_ids(false))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_preset_priority() {
        assert_eq!(LogPreset::from_flags(true, true, true, true), LogPreset::Quiet);
        assert_eq!(LogPreset::from_flags(true, true, true, false), LogPreset::Trace);
        assert_eq!(LogPreset::from_flags(true, true, false, false), LogPreset::Debug);
        assert_eq!(LogPreset::from_flags(true, false, false, false), LogPreset::Verbose);
        assert_eq!(LogPreset::from_flags(false, false, false, false), LogPreset::Production);
    }

    #[test]
    fn test_overrides_parsing() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["scanner=debug".into(), "phones=TRACE,alerts=warning".into(), "monitor=loud".into()],
            LogFormat::Text,
        );

        assert_eq!(config.overrides.get("chatwatch::scanner"), Some(&Level::DEBUG));
        assert_eq!(config.overrides.get("chatwatch::phones"), Some(&Level::TRACE));
        assert_eq!(config.overrides.get("chatwatch::alerts"), Some(&Level::WARN));
        assert!(!config.overrides.contains_key("chatwatch::monitor"));
    }

    #[test]
    fn test_full_target_passthrough() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["chatwatch::corrector=debug".into(), "tower_http=trace".into()],
            LogFormat::Text,
        );

        assert_eq!(config.overrides.get("chatwatch::corrector"), Some(&Level::DEBUG));
        assert_eq!(config.overrides.get("tower_http"), Some(&Level::TRACE));
    }

    #[test]
    fn test_directives_put_overrides_last() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            true,
            vec!["scanner=debug".into()],
            LogFormat::Text,
        );
        assert_eq!(
            config.directives(),
            "chatwatch=warn,tower_http=error,chatwatch::scanner=debug"
        );
    }
}
