//! Human-readable rendering of reports.

use coast_connect_report_models::HazardReport;

const TITLE_WIDTH: usize = 40;

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Prints one row per report.
pub fn print_table(reports: &[HazardReport]) {
    if reports.is_empty() {
        println!("No reports found.");
        return;
    }

    println!(
        "{:<34} {:<16} {:<9} {:<14} {:<8} TITLE",
        "ID", "TYPE", "SEVERITY", "STATUS", "SOCIAL"
    );
    println!("{}", "-".repeat(120));

    for report in reports {
        let social = if report.is_trending() {
            format!("{}*", report.social_mentions.total)
        } else {
            report.social_mentions.total.to_string()
        };

        println!(
            "{:<34} {:<16} {:<9} {:<14} {:<8} {}",
            report.id,
            report.hazard_type,
            report.severity,
            report.status,
            social,
            truncate(&report.title, TITLE_WIDTH)
        );
    }

    println!("\n{} report(s)", reports.len());
}

/// Prints every field of a single report.
pub fn print_report(report: &HazardReport) {
    println!("{}", report.title);
    println!("{}", "=".repeat(report.title.chars().count().max(8)));
    println!("ID:          {}", report.id);
    println!("Type:        {}", report.hazard_type);
    println!("Severity:    {}", report.severity);
    println!("Status:      {}", report.status);
    println!(
        "Location:    {:.4}, {:.4}{}",
        report.location.lat,
        report.location.lng,
        report
            .location
            .address
            .as_deref()
            .map(|a| format!(" ({a})"))
            .unwrap_or_default()
    );
    println!(
        "Reported by: {} [{}]",
        report.reported_by, report.reporter_id
    );
    println!("Created:     {}", report.created_at.to_rfc3339());
    println!("Updated:     {}", report.updated_at.to_rfc3339());

    if let Some(verifier) = &report.verified_by {
        println!("Verified by: {verifier}");
    }
    if let Some(notes) = &report.verification_notes {
        println!("Notes:       {notes}");
    }
    if let Some(images) = report.images.as_ref().filter(|i| !i.is_empty()) {
        println!("Images:      {}", images.join(", "));
    }

    println!("\n{}\n", report.description);

    let mentions = &report.social_mentions;
    println!(
        "Social:      {} mentions ({} recent){}",
        mentions.total,
        mentions.recent,
        if mentions.trending { ", trending" } else { "" }
    );
    if !mentions.keywords.is_empty() {
        println!("Keywords:    {}", mentions.keywords.join(", "));
    }
    println!(
        "Correlation: {:.2} ({} verified, {} false positives)",
        report.social_correlation.score(),
        report.social_correlation.verified_correlations,
        report.social_correlation.false_positives
    );
}
