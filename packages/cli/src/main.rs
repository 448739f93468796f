#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for reading and curating hazard reports.
//!
//! ```text
//! coast_connect list [--status pending]
//! coast_connect show <id>
//! coast_connect create --title ... --description ... --hazard-type flood \
//!     --severity high --lat 13.08 --lng 80.27 [--address ...] [--image ...]
//! coast_connect verify <id> --status verified [--by ...] [--notes ...]
//! coast_connect pending | trending | social-activity
//! coast_connect refresh-social <id>
//! coast_connect watch
//! ```
//!
//! Reports live in `$COAST_CONNECT_DATA_DIR` (default `data/`). Every
//! command accepts `--json` for machine-readable output.

mod display;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use coast_connect_report_models::{
    CreateReportInput, HazardReport, ImageRef, Location, ReportStatus, ReportVerification,
};
use coast_connect_social::create_provider_from_env;
use coast_connect_storage::file::FileBackend;
use coast_connect_storage::paths;
use coast_connect_store::{ReportStore, SharedSession, StoreConfig};

#[derive(Parser)]
#[command(name = "coast_connect", about = "Browse and curate coastal hazard reports")]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List reports, newest first
    List {
        /// Only show reports with this status
        #[arg(long)]
        status: Option<ReportStatus>,
    },
    /// Show a single report
    Show {
        /// Report ID
        id: String,
    },
    /// File a new hazard report
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// tsunami, storm_surge, high_waves, flood, rip_current,
        /// coastal_erosion, oil_spill, or other
        #[arg(long)]
        hazard_type: String,
        /// low, medium, high, or critical
        #[arg(long)]
        severity: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        address: Option<String>,
        /// Image reference (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,
        /// Exit without waiting for the first social update. The scheduled
        /// update is cancelled when the process exits.
        #[arg(long)]
        no_wait_social: bool,
    },
    /// Set a report's verification status
    Verify {
        /// Report ID
        id: String,
        #[arg(long)]
        status: ReportStatus,
        /// Who made the decision
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List reports awaiting review
    Pending,
    /// List trending reports
    Trending,
    /// List reports with high social media activity
    SocialActivity,
    /// Recompute social signals for a report now
    RefreshSocial {
        /// Report ID
        id: String,
    },
    /// Follow changes made by other processes until interrupted
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

fn print_reports(reports: &[HazardReport], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        display::print_table(reports);
    }
    Ok(())
}

fn print_one(report: &HazardReport, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        display::print_report(report);
    }
    Ok(())
}

/// Blocks until every scheduled social update has run.
async fn wait_for_social_updates(store: &ReportStore) {
    if store.pending_social_updates() > 0 {
        log::info!("Waiting for social signals...");
    }
    while store.pending_social_updates() > 0 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn not_found(id: &str) -> ! {
    eprintln!("Report not found: {id}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let backend = FileBackend::open(&paths::data_dir())?;
    let storage = backend.connect();
    let store = ReportStore::new(
        Arc::new(storage.clone()),
        Arc::new(SharedSession::from_env()),
        Arc::from(create_provider_from_env()?),
        StoreConfig::from_env()?,
    );
    store.initialize().await?;
    log::debug!("Using data directory {}", backend.dir().display());

    match cli.command {
        Commands::List { status } => {
            let reports = match status {
                Some(status) => store.get_reports_by_status(status).await,
                None => store.reports().await,
            };
            print_reports(&reports, cli.json)?;
        }
        Commands::Show { id } => {
            let Some(report) = store.get_report(&id).await else {
                not_found(&id);
            };
            print_one(&report, cli.json)?;
        }
        Commands::Create {
            title,
            description,
            hazard_type,
            severity,
            lat,
            lng,
            address,
            images,
            no_wait_social,
        } => {
            let mut location = Location::new(lat, lng);
            location.address = address;
            let input = CreateReportInput {
                title,
                description,
                hazard_type,
                severity,
                location,
                images: (!images.is_empty())
                    .then(|| images.iter().map(|i| ImageRef::from(i.as_str())).collect()),
            };

            let mut report = store.create_report(&input).await?;

            if !no_wait_social {
                wait_for_social_updates(&store).await;
                if let Some(updated) = store.get_report(&report.id).await {
                    report = updated;
                }
            }

            if !cli.json {
                println!("Created report {}\n", report.id);
            }
            print_one(&report, cli.json)?;
        }
        Commands::Verify {
            id,
            status,
            by,
            notes,
        } => {
            let report = store
                .verify_report(&ReportVerification {
                    report_id: id,
                    status,
                    verified_by: by,
                    notes,
                })
                .await?;
            print_one(&report, cli.json)?;
        }
        Commands::Pending => {
            let reports = store.get_reports_by_status(ReportStatus::Pending).await;
            print_reports(&reports, cli.json)?;
        }
        Commands::Trending => {
            print_reports(&store.get_trending_reports().await, cli.json)?;
        }
        Commands::SocialActivity => {
            let reports = store.get_reports_with_high_social_activity().await;
            print_reports(&reports, cli.json)?;
        }
        Commands::RefreshSocial { id } => {
            if store.get_report(&id).await.is_none() {
                not_found(&id);
            }
            store.update_social_mentions(&id).await;
            let Some(report) = store.get_report(&id).await else {
                not_found(&id);
            };
            print_one(&report, cli.json)?;
        }
        Commands::Watch { interval_ms } => {
            let watcher = storage.spawn_watcher(Duration::from_millis(interval_ms));
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            let mut last_seen: Option<Vec<HazardReport>> = None;

            println!("Watching {} (Ctrl-C to stop)", backend.dir().display());

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        let reports = store.reports().await;
                        if last_seen.as_ref() != Some(&reports) {
                            let pending = store.get_pending_reports_count().await;
                            println!(
                                "[{}] {} report(s), {pending} pending",
                                chrono::Utc::now().format("%H:%M:%S"),
                                reports.len()
                            );
                            last_seen = Some(reports);
                        }
                    }
                }
            }

            watcher.abort();
        }
    }

    store.shutdown();

    Ok(())
}
