//! Store configuration.
//!
//! Defaults match the web client: the collection lives in the
//! `oceanHazardReports` slot and a social update is scheduled two seconds
//! after each new report.

use std::time::Duration;

use crate::StoreError;

/// Slot holding the serialized report collection.
pub const DEFAULT_STORAGE_KEY: &str = "oceanHazardReports";

/// Delay between creating a report and its first social update.
pub const DEFAULT_SOCIAL_UPDATE_DELAY: Duration = Duration::from_millis(2000);

/// Environment variable overriding [`StoreConfig::storage_key`].
pub const STORAGE_KEY_ENV: &str = "COAST_CONNECT_STORAGE_KEY";

/// Environment variable overriding [`StoreConfig::social_update_delay`], in
/// milliseconds. `0` disables scheduled updates.
pub const SOCIAL_DELAY_ENV: &str = "COAST_CONNECT_SOCIAL_DELAY_MS";

/// Settings for a [`crate::ReportStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Durable slot holding the collection.
    pub storage_key: String,
    /// How long after creation to run the first social update. `None`
    /// disables scheduling.
    pub social_update_delay: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            social_update_delay: Some(DEFAULT_SOCIAL_UPDATE_DELAY),
        }
    }
}

impl StoreConfig {
    /// Reads overrides from the environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if `COAST_CONNECT_SOCIAL_DELAY_MS` is
    /// not an unsigned integer or the storage key is blank.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let mut config = Self::default();

        if let Some(key) = lookup(STORAGE_KEY_ENV) {
            let key = key.trim();
            if key.is_empty() {
                return Err(StoreError::Config {
                    message: format!("{STORAGE_KEY_ENV} must not be blank"),
                });
            }
            config.storage_key = key.to_string();
        }

        if let Some(delay) = lookup(SOCIAL_DELAY_ENV) {
            let millis = delay.trim().parse::<u64>().map_err(|e| StoreError::Config {
                message: format!("{SOCIAL_DELAY_ENV} must be a number of milliseconds: {e}"),
            })?;
            config.social_update_delay = (millis > 0).then(|| Duration::from_millis(millis));
        }

        Ok(config)
    }

    /// Uses a different storage slot.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Changes or disables the scheduled social update.
    #[must_use]
    pub const fn with_social_update_delay(mut self, delay: Option<Duration>) -> Self {
        self.social_update_delay = delay;
        self
    }
}
