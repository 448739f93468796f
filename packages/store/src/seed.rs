//! Example reports written to an empty store on first run.
//!
//! Timestamps are relative to the moment of seeding so the examples always
//! look recent.

use chrono::{DateTime, Duration, Utc};
use coast_connect_report_models::{
    HazardReport, HazardType, Location, PlatformCounts, ReportStatus, SentimentCounts, Severity,
    SocialCorrelation, SocialMentions,
};

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(ToString::to_string).collect()
}

/// Returns the three seed reports, newest first.
#[must_use]
pub fn seed_reports(now: DateTime<Utc>) -> Vec<HazardReport> {
    vec![
        HazardReport {
            id: "1".to_string(),
            title: "Tsunami Warning - Chennai Coast".to_string(),
            description: "Massive waves approaching the coastline. Water level rising rapidly. \
                          Immediate evacuation recommended."
                .to_string(),
            hazard_type: HazardType::Tsunami,
            severity: Severity::Critical,
            location: Location::new(13.0827, 80.2707)
                .with_address("Marina Beach, Chennai, Tamil Nadu"),
            reported_by: "Coastal Observer".to_string(),
            reporter_id: "user_1".to_string(),
            status: ReportStatus::Pending,
            verified_by: None,
            verification_notes: None,
            created_at: now - Duration::minutes(30),
            updated_at: now - Duration::minutes(30),
            images: Some(vec!["tsunami1.jpg".to_string(), "tsunami2.jpg".to_string()]),
            social_mentions: SocialMentions {
                total: 156,
                recent: 45,
                platforms: PlatformCounts {
                    twitter: 78,
                    facebook: 34,
                    instagram: 23,
                    youtube: 12,
                    tiktok: 9,
                },
                sentiment: SentimentCounts {
                    positive: 5,
                    negative: 67,
                    neutral: 23,
                    concern: 89,
                    panic: 34,
                },
                trending: true,
                peak_time: Some(now - Duration::minutes(15)),
                keywords: keywords(&["tsunami", "chennai", "evacuation", "emergency", "waves"]),
                influencer_mentions: 12,
            },
            social_correlation: SocialCorrelation::new(0.92, 23, 2, now),
        },
        HazardReport {
            id: "2".to_string(),
            title: "Storm Surge - Goa Coastline".to_string(),
            description: "Heavy storm surge flooding coastal areas. Roads are submerged. \
                          Several vehicles stuck."
                .to_string(),
            hazard_type: HazardType::StormSurge,
            severity: Severity::High,
            location: Location::new(15.2993, 74.124).with_address("Calangute Beach, Goa"),
            reported_by: "Local Volunteer".to_string(),
            reporter_id: "user_2".to_string(),
            status: ReportStatus::Verified,
            verified_by: Some("Official Team".to_string()),
            verification_notes: Some(
                "Verified through satellite imagery and ground reports".to_string(),
            ),
            created_at: now - Duration::hours(2),
            updated_at: now - Duration::hours(1),
            images: None,
            social_mentions: SocialMentions {
                total: 89,
                recent: 23,
                platforms: PlatformCounts {
                    twitter: 45,
                    facebook: 28,
                    instagram: 12,
                    youtube: 3,
                    tiktok: 1,
                },
                sentiment: SentimentCounts {
                    positive: 8,
                    negative: 34,
                    neutral: 25,
                    concern: 22,
                    panic: 0,
                },
                trending: false,
                peak_time: None,
                keywords: keywords(&["storm", "goa", "flooding", "rescue"]),
                influencer_mentions: 3,
            },
            social_correlation: SocialCorrelation::new(0.76, 15, 1, now),
        },
        HazardReport {
            id: "3".to_string(),
            title: "High Waves - Kerala Coast".to_string(),
            description: "Unusually high waves observed. Fishermen advised to avoid going to sea."
                .to_string(),
            hazard_type: HazardType::HighWaves,
            severity: Severity::Medium,
            location: Location::new(8.5241, 76.9366).with_address("Kovalam Beach, Kerala"),
            reported_by: "Fisherman".to_string(),
            reporter_id: "user_3".to_string(),
            status: ReportStatus::Investigating,
            verified_by: None,
            verification_notes: None,
            created_at: now - Duration::hours(6),
            updated_at: now - Duration::hours(6),
            images: None,
            social_mentions: SocialMentions {
                total: 34,
                recent: 12,
                platforms: PlatformCounts {
                    twitter: 18,
                    facebook: 10,
                    instagram: 4,
                    youtube: 2,
                    tiktok: 0,
                },
                sentiment: SentimentCounts {
                    positive: 3,
                    negative: 12,
                    neutral: 15,
                    concern: 4,
                    panic: 0,
                },
                trending: false,
                peak_time: None,
                keywords: keywords(&["waves", "kerala", "fishing", "warning"]),
                influencer_mentions: 1,
            },
            social_correlation: SocialCorrelation::new(0.58, 8, 0, now),
        },
    ]
}
