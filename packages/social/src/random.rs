//! Simulated social signals drawn from a seedable RNG.
//!
//! Every counter is drawn uniformly from a fixed inclusive range, so the
//! generated metrics look like a modest amount of fresh social chatter
//! around a report.

use std::ops::RangeInclusive;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use coast_connect_report_models::{
    PlatformCounts, SentimentCounts, SocialCorrelation, SocialMentions,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{SignalError, SocialSignalProvider, SocialSignals};

/// Simulated analysis latency applied before each computation.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(200);

/// Keywords attached to every simulated update.
pub const KEYWORDS: &[&str] = &["emergency", "hazard", "safety", "alert"];

// Inclusive ranges for each simulated counter.
pub const TOTAL: RangeInclusive<u32> = 10..=59;
pub const RECENT: RangeInclusive<u32> = 5..=24;
pub const TWITTER: RangeInclusive<u32> = 5..=29;
pub const FACEBOOK: RangeInclusive<u32> = 3..=17;
pub const INSTAGRAM: RangeInclusive<u32> = 2..=11;
pub const YOUTUBE: RangeInclusive<u32> = 1..=5;
pub const TIKTOK: RangeInclusive<u32> = 1..=3;
pub const POSITIVE: RangeInclusive<u32> = 2..=11;
pub const NEGATIVE: RangeInclusive<u32> = 5..=24;
pub const NEUTRAL: RangeInclusive<u32> = 5..=19;
pub const CONCERN: RangeInclusive<u32> = 10..=34;
pub const PANIC: RangeInclusive<u32> = 1..=5;
pub const INFLUENCER: RangeInclusive<u32> = 1..=3;
pub const VERIFIED_CORRELATIONS: RangeInclusive<u32> = 5..=14;
pub const FALSE_POSITIVES: RangeInclusive<u32> = 0..=2;

/// A uniform `[0, 1)` draw above this marks the report as trending.
pub const TRENDING_CUTOFF: f64 = 0.7;
/// Lowest possible correlation score.
pub const SCORE_FLOOR: f64 = 0.5;
/// Width of the correlation score range above [`SCORE_FLOOR`].
pub const SCORE_SPREAD: f64 = 0.4;

/// Generates social signals from a pseudo-random number generator.
pub struct RandomSignalProvider {
    rng: Mutex<StdRng>,
    latency: Duration,
}

impl RandomSignalProvider {
    /// A provider whose output is fully determined by `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: DEFAULT_LATENCY,
        }
    }

    /// A provider seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            latency: DEFAULT_LATENCY,
        }
    }

    /// Overrides the simulated latency.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn draw(&self) -> Result<SocialSignals, SignalError> {
        let mut rng = self.rng.lock().map_err(|_| SignalError::Unavailable {
            message: "random generator lock poisoned".to_string(),
        })?;
        Ok(generate(&mut *rng))
    }
}

/// Draws one set of signals from `rng`.
pub fn generate<R: Rng>(rng: &mut R) -> SocialSignals {
    let mentions = SocialMentions {
        total: rng.gen_range(TOTAL),
        recent: rng.gen_range(RECENT),
        platforms: PlatformCounts {
            twitter: rng.gen_range(TWITTER),
            facebook: rng.gen_range(FACEBOOK),
            instagram: rng.gen_range(INSTAGRAM),
            youtube: rng.gen_range(YOUTUBE),
            tiktok: rng.gen_range(TIKTOK),
        },
        sentiment: SentimentCounts {
            positive: rng.gen_range(POSITIVE),
            negative: rng.gen_range(NEGATIVE),
            neutral: rng.gen_range(NEUTRAL),
            concern: rng.gen_range(CONCERN),
            panic: rng.gen_range(PANIC),
        },
        trending: rng.r#gen::<f64>() > TRENDING_CUTOFF,
        peak_time: None,
        keywords: KEYWORDS.iter().map(ToString::to_string).collect(),
        influencer_mentions: rng.gen_range(INFLUENCER),
    };

    let correlation = SocialCorrelation::new(
        rng.r#gen::<f64>().mul_add(SCORE_SPREAD, SCORE_FLOOR),
        rng.gen_range(VERIFIED_CORRELATIONS),
        rng.gen_range(FALSE_POSITIVES),
        Utc::now(),
    );

    SocialSignals {
        mentions,
        correlation,
    }
}

#[async_trait]
impl SocialSignalProvider for RandomSignalProvider {
    async fn compute_signals(&self, report_id: &str) -> Result<SocialSignals, SignalError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let signals = self.draw()?;
        log::debug!(
            "Simulated social signals for report {report_id}: total={} trending={} score={:.2}",
            signals.mentions.total,
            signals.mentions.trending,
            signals.correlation.score()
        );
        Ok(signals)
    }
}
