#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Hazard report types, classification enums, and input validation.
//!
//! This crate defines the canonical report shape shared by the storage
//! layer, the report store, and the CLI. The JSON encoding matches the
//! collection the web client keeps in local storage: camelCase field names
//! and `snake_case` enum values.

pub mod input;
pub mod social;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use input::{CreateReportInput, ImageRef, NewReport, ReportVerification, ValidationError};
pub use social::{
    HIGH_ACTIVITY_THRESHOLD, PlatformCounts, SentimentCounts, SocialCorrelation, SocialMentions,
};

/// Kind of coastal hazard being reported.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HazardType {
    /// Seismic sea wave
    Tsunami,
    /// Abnormal rise of water generated by a storm
    StormSurge,
    /// Unusually high or dangerous waves
    HighWaves,
    /// Coastal or tidal flooding
    Flood,
    /// Strong channelled current flowing away from shore
    RipCurrent,
    /// Loss of shoreline, dunes, or cliffs
    CoastalErosion,
    /// Oil or chemical contamination
    OilSpill,
    /// Hazards that don't map to any other type
    Other,
}

impl HazardType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Tsunami,
            Self::StormSurge,
            Self::HighWaves,
            Self::Flood,
            Self::RipCurrent,
            Self::CoastalErosion,
            Self::OilSpill,
            Self::Other,
        ]
    }
}

/// How dangerous a reported hazard is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Minor, no immediate risk
    Low,
    /// Caution advised
    Medium,
    /// Significant risk to people or property
    High,
    /// Immediate danger, evacuation likely
    Critical,
}

impl Severity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }
}

/// Verification state of a report.
///
/// Every report starts as [`ReportStatus::Pending`]. Any state may move to
/// any other state through verification; there is no terminal state.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportStatus {
    /// Awaiting review
    #[default]
    Pending,
    /// Under review by an official team
    Investigating,
    /// Confirmed as a real hazard
    Verified,
    /// Determined to be inaccurate or a duplicate
    Rejected,
}

impl ReportStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pending,
            Self::Investigating,
            Self::Verified,
            Self::Rejected,
        ]
    }
}

/// Where a hazard was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Human-readable address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    /// Creates a location without an address.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            address: None,
        }
    }

    /// Attaches a human-readable address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Whether both coordinates are finite and inside the valid
    /// latitude/longitude ranges.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A single hazard observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardReport {
    /// Unique report identifier.
    pub id: String,
    /// Short headline.
    pub title: String,
    /// Free-text description of what was observed.
    pub description: String,
    /// Kind of hazard.
    pub hazard_type: HazardType,
    /// How dangerous the hazard is.
    pub severity: Severity,
    /// Where the hazard was observed.
    pub location: Location,
    /// Display name of the reporter.
    pub reported_by: String,
    /// Identifier of the reporting user. Not an owning reference.
    pub reporter_id: String,
    /// Verification state.
    pub status: ReportStatus,
    /// Who last changed the verification state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    /// Notes attached by the verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_notes: Option<String>,
    /// When the report was created. Never changes.
    pub created_at: DateTime<Utc>,
    /// When the report was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Image references attached to the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// Social media mention metrics.
    #[serde(default)]
    pub social_mentions: SocialMentions,
    /// How well social activity corroborates the report.
    #[serde(default)]
    pub social_correlation: SocialCorrelation,
}

impl HazardReport {
    /// Whether the report has a high volume of social mentions or is
    /// trending.
    #[must_use]
    pub const fn has_high_social_activity(&self) -> bool {
        self.social_mentions.is_high_activity()
    }

    /// Whether the report is currently trending on social media.
    #[must_use]
    pub const fn is_trending(&self) -> bool {
        self.social_mentions.trending
    }
}
