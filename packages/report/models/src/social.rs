//! Social media signal records attached to every report.
//!
//! These are derived metrics owned by exactly one report. Updates replace
//! them wholesale rather than merging individual counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Total mention count above which a report counts as high social activity.
pub const HIGH_ACTIVITY_THRESHOLD: u32 = 50;

/// Mention counts per social platform.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCounts {
    /// Mentions on Twitter/X.
    pub twitter: u32,
    /// Mentions on Facebook.
    pub facebook: u32,
    /// Mentions on Instagram.
    pub instagram: u32,
    /// Mentions on `YouTube`.
    pub youtube: u32,
    /// Mentions on `TikTok`.
    pub tiktok: u32,
}

/// Mention counts per sentiment bucket.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    /// Reassuring or supportive posts.
    pub positive: u32,
    /// Negative posts.
    pub negative: u32,
    /// Purely informational posts.
    pub neutral: u32,
    /// Posts expressing worry.
    pub concern: u32,
    /// Posts expressing alarm.
    pub panic: u32,
}

/// Social media mention metrics for a report.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMentions {
    /// All mentions seen so far.
    pub total: u32,
    /// Mentions in the recent window.
    pub recent: u32,
    /// Breakdown by platform.
    pub platforms: PlatformCounts,
    /// Breakdown by sentiment.
    pub sentiment: SentimentCounts,
    /// Whether the report is trending.
    pub trending: bool,
    /// When mention volume peaked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_time: Option<DateTime<Utc>>,
    /// Keywords associated with the mentions.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Mentions from high-reach accounts.
    pub influencer_mentions: u32,
}

impl SocialMentions {
    /// Whether mention volume exceeds [`HIGH_ACTIVITY_THRESHOLD`] or the
    /// report is trending.
    #[must_use]
    pub const fn is_high_activity(&self) -> bool {
        self.total > HIGH_ACTIVITY_THRESHOLD || self.trending
    }

    /// Replaces these mentions with `next`, keeping the current peak time
    /// when `next` does not carry one.
    pub fn replace_with(&mut self, next: Self) {
        let peak_time = next.peak_time.or(self.peak_time);
        *self = Self { peak_time, ..next };
    }
}

/// How strongly social activity corroborates a report.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialCorrelation {
    #[serde(deserialize_with = "deserialize_score")]
    score: f64,
    /// Mentions confirmed to match the report.
    pub verified_correlations: u32,
    /// Mentions found to be unrelated.
    pub false_positives: u32,
    /// When the correlation was last computed.
    pub last_updated: DateTime<Utc>,
}

/// Clamps into `[0.0, 1.0]`, mapping NaN to zero.
fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(clamp_score)
}

impl SocialCorrelation {
    /// Creates a correlation record, clamping `score` into `[0.0, 1.0]`.
    ///
    /// A NaN score is treated as zero.
    #[must_use]
    pub fn new(
        score: f64,
        verified_correlations: u32,
        false_positives: u32,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            score: clamp_score(score),
            verified_correlations,
            false_positives,
            last_updated,
        }
    }

    /// Correlation score, always within `[0.0, 1.0]`.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// A zeroed record stamped with `at`.
    #[must_use]
    pub fn zeroed(at: DateTime<Utc>) -> Self {
        Self::new(0.0, 0, 0, at)
    }
}
