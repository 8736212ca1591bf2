//! Shared application state.

use crate::config::Config;
use crate::notifications::NotificationStore;
use crate::settings_store::SettingsStore;
use chatwatch_core::{
    validate_api_key, GeminiCorrector, NotificationLedger, PhoneExtractor, TextCorrector,
};
use chatwatch_types::{Settings, SettingsPatch, SettingsView};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub extractor: Arc<PhoneExtractor>,
    pub corrector: Arc<dyn TextCorrector>,
    pub ledger: Mutex<NotificationLedger>,
    pub notifications: Mutex<NotificationStore>,
    settings: RwLock<Settings>,
    settings_tx: watch::Sender<Settings>,
    store: SettingsStore,
}

impl AppState {
    /// Build state with the Gemini corrector from `config`.
    pub async fn new(config: Config) -> chatwatch_core::Result<Self> {
        let corrector = GeminiCorrector::new(&config.gemini_base_url, &config.gemini_model)?;
        Self::with_corrector(config, Arc::new(corrector)).await
    }

    pub async fn with_corrector(
        config: Config,
        corrector: Arc<dyn TextCorrector>,
    ) -> chatwatch_core::Result<Self> {
        let extractor = Arc::new(PhoneExtractor::new(config.area_codes.as_slice(), config.phone_format)?);
        let store = SettingsStore::new(config.settings_path.clone());

        let settings = match store.load().await {
            Ok(Some(settings)) => {
                info!(target: "chatwatch::settings", "Loaded settings from {}", store.path().display());
                if let Err(e) = settings.validate() {
                    warn!(target: "chatwatch::settings", "Clamping stored settings: {}", e);
                }
                settings.clamped()
            }
            Ok(None) => Settings {
                notification_interval: config.inactivity_threshold_minutes,
                ..Settings::default()
            },
            Err(e) => {
                warn!(
                    target: "chatwatch::settings",
                    "Ignoring unreadable settings at {}: {}",
                    store.path().display(),
                    e
                );
                Settings {
                    notification_interval: config.inactivity_threshold_minutes,
                    ..Settings::default()
                }
            }
        };

        let (settings_tx, _) = watch::channel(settings.clone());

        Ok(Self {
            ledger: Mutex::new(NotificationLedger::new(config.notification_cooldown())),
            notifications: Mutex::new(NotificationStore::default()),
            extractor,
            corrector,
            settings: RwLock::new(settings),
            settings_tx,
            store,
            config,
        })
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Receiver that observes every committed settings change.
    pub fn subscribe_settings(&self) -> watch::Receiver<Settings> {
        self.settings_tx.subscribe()
    }

    /// Validate, persist and publish a partial update. On any error the
    /// current settings are left untouched.
    pub async fn update_settings(&self, patch: SettingsPatch) -> chatwatch_core::Result<Settings> {
        let mut current = self.settings.write().await;
        let mut updated = current.clone();
        updated.apply(patch)?;
        self.store.save(&updated).await?;

        *current = updated.clone();
        self.settings_tx.send_replace(updated.clone());
        info!(
            target: "chatwatch::settings",
            "Settings updated: enabled={}, interval={} min, sound={}",
            updated.enabled,
            updated.notification_interval,
            updated.sound_enabled
        );
        Ok(updated)
    }

    /// Key from settings, falling back to the one in the config file.
    pub async fn configured_api_key(&self) -> Option<String> {
        self.key_for(&*self.settings.read().await).map(str::to_string)
    }

    fn key_for<'a>(&'a self, settings: &'a Settings) -> Option<&'a str> {
        settings.api_key.as_deref().or(self.config.api_key.as_deref())
    }

    /// Redacted view of `settings`; `has_api_key` reflects the key actually
    /// used for correction, config fallback included.
    pub fn view_of(&self, settings: &Settings) -> SettingsView {
        SettingsView {
            has_api_key: validate_api_key(self.key_for(settings)).is_ok(),
            ..settings.view()
        }
    }
}
