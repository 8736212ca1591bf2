//! Runtime settings shared by the popup, the background and the page monitor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest alert interval accepted from the control surface, in minutes.
pub const MIN_NOTIFICATION_INTERVAL: u32 = 5;
/// Highest alert interval accepted from the control surface, in minutes.
pub const MAX_NOTIFICATION_INTERVAL: u32 = 60;
/// Default inactivity threshold in minutes.
pub const DEFAULT_NOTIFICATION_INTERVAL: u32 = 20;

/// Persisted monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Inactivity threshold in minutes.
    #[serde(default = "default_interval")]
    pub notification_interval: u32,
    #[serde(default = "default_enabled")]
    pub sound_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u32 {
    DEFAULT_NOTIFICATION_INTERVAL
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            notification_interval: DEFAULT_NOTIFICATION_INTERVAL,
            sound_enabled: true,
            api_key: None,
        }
    }
}

/// Partial update sent with `UPDATE_SETTINGS`. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    /// An empty string clears the stored key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error(
        "notification interval must be between {MIN_NOTIFICATION_INTERVAL} and {MAX_NOTIFICATION_INTERVAL} minutes, got {0}"
    )]
    IntervalOutOfRange(u32),
}

fn check_interval(interval: u32) -> Result<u32, SettingsError> {
    if (MIN_NOTIFICATION_INTERVAL..=MAX_NOTIFICATION_INTERVAL).contains(&interval) {
        Ok(interval)
    } else {
        Err(SettingsError::IntervalOutOfRange(interval))
    }
}

impl Settings {
    /// Merge a patch into these settings. Nothing changes if the patch is invalid.
    pub fn apply(&mut self, patch: SettingsPatch) -> Result<(), SettingsError> {
        if let Some(interval) = patch.notification_interval {
            self.notification_interval = check_interval(interval)?;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(sound) = patch.sound_enabled {
            self.sound_enabled = sound;
        }
        if let Some(key) = patch.api_key {
            let key = key.trim().to_string();
            self.api_key = if key.is_empty() { None } else { Some(key) };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        check_interval(self.notification_interval).map(|_| ())
    }

    /// Pull an out-of-range interval back to the nearest accepted bound.
    pub fn clamped(mut self) -> Self {
        self.notification_interval = self
            .notification_interval
            .clamp(MIN_NOTIFICATION_INTERVAL, MAX_NOTIFICATION_INTERVAL);
        self
    }

    /// Settings as shown to callers: the key itself never leaves the background.
    pub fn view(&self) -> SettingsView {
        SettingsView {
            enabled: self.enabled,
            notification_interval: self.notification_interval,
            sound_enabled: self.sound_enabled,
            has_api_key: self.api_key.is_some(),
        }
    }
}

/// Redacted settings returned by `GET_SETTINGS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub enabled: bool,
    pub notification_interval: u32,
    pub sound_enabled: bool,
    pub has_api_key: bool,
}
