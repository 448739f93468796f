#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Social signal providers.
//!
//! A [`SocialSignalProvider`] produces the social mention metrics and
//! correlation score for a report. There is no real analytics backend;
//! [`random::RandomSignalProvider`] synthesizes plausible values and
//! [`FixedSignalProvider`] returns canned values for tests.

pub mod random;

use async_trait::async_trait;
use coast_connect_report_models::{SocialCorrelation, SocialMentions};

pub use random::RandomSignalProvider;

/// Environment variable selecting the provider (`random` or `none`).
pub const PROVIDER_ENV: &str = "COAST_CONNECT_SOCIAL_PROVIDER";

/// Environment variable holding a `u64` seed for the random provider.
pub const SEED_ENV: &str = "COAST_CONNECT_SOCIAL_SEED";

/// Errors from signal providers.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The provider could not produce signals.
    #[error("Signal provider unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// Provider configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is misconfigured.
        message: String,
    },
}

/// Freshly computed social records for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialSignals {
    /// Replacement mention metrics.
    pub mentions: SocialMentions,
    /// Replacement correlation record.
    pub correlation: SocialCorrelation,
}

/// Trait for social signal sources.
#[async_trait]
pub trait SocialSignalProvider: Send + Sync {
    /// Computes the current social signals for a report.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] if signals cannot be produced.
    async fn compute_signals(&self, report_id: &str) -> Result<SocialSignals, SignalError>;
}

/// Returns the same signals on every call.
#[derive(Debug, Clone)]
pub struct FixedSignalProvider {
    signals: SocialSignals,
}

impl FixedSignalProvider {
    /// Creates a provider that always returns `signals`.
    #[must_use]
    pub const fn new(signals: SocialSignals) -> Self {
        Self { signals }
    }
}

#[async_trait]
impl SocialSignalProvider for FixedSignalProvider {
    async fn compute_signals(&self, report_id: &str) -> Result<SocialSignals, SignalError> {
        log::trace!("Returning fixed social signals for report {report_id}");
        Ok(self.signals.clone())
    }
}

/// Provider that never produces signals, for deployments with the feature
/// turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSignalProvider;

#[async_trait]
impl SocialSignalProvider for DisabledSignalProvider {
    async fn compute_signals(&self, _report_id: &str) -> Result<SocialSignals, SignalError> {
        Err(SignalError::Unavailable {
            message: "social signals are disabled".to_string(),
        })
    }
}

/// Creates a signal provider based on environment variables.
///
/// `COAST_CONNECT_SOCIAL_PROVIDER` selects `random` (the default) or
/// `none`. For the random provider, `COAST_CONNECT_SOCIAL_SEED` makes the
/// output reproducible.
///
/// # Errors
///
/// Returns [`SignalError::Config`] if the provider name is unknown or the
/// seed is not a valid `u64`.
pub fn create_provider_from_env() -> Result<Box<dyn SocialSignalProvider>, SignalError> {
    let provider = std::env::var(PROVIDER_ENV).unwrap_or_else(|_| "random".to_string());

    match provider.to_lowercase().as_str() {
        "random" | "simulated" => {
            let provider = match std::env::var(SEED_ENV) {
                Ok(seed) => {
                    let seed = seed.trim().parse::<u64>().map_err(|e| SignalError::Config {
                        message: format!("{SEED_ENV} must be an unsigned integer: {e}"),
                    })?;
                    log::info!("Using seeded random social signals (seed {seed})");
                    RandomSignalProvider::seeded(seed)
                }
                Err(_) => RandomSignalProvider::from_entropy(),
            };
            Ok(Box::new(provider))
        }
        "none" | "disabled" => {
            log::info!("Social signals disabled");
            Ok(Box::new(DisabledSignalProvider))
        }
        other => Err(SignalError::Config {
            message: format!("Unknown social provider: {other}. Use 'random' or 'none'."),
        }),
    }
}
