#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The hazard report store.
//!
//! [`ReportStore`] owns the in-memory report collection for one process and
//! keeps it equal to a single durable slot:
//!
//! - Every mutation builds the next collection, writes it durably, and only
//!   then swaps it into memory. A failed write leaves memory untouched.
//! - Mutations hold the collection's write lock across the durable write, so
//!   operations within one process form a single linear history.
//! - Writes by other handles on the same backend arrive as storage events;
//!   the store answers each one by reloading the whole collection (last
//!   writer wins).
//! - New reports get a delayed, best-effort social update scheduled in the
//!   background. Failures there are logged and never reach the caller.

pub mod config;
mod scheduler;
pub mod seed;
pub mod session;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::{DateTime, TimeDelta, Utc};
use coast_connect_report_models::{
    CreateReportInput, HazardReport, ReportStatus, ReportVerification, SocialCorrelation,
    SocialMentions, ValidationError,
};
use coast_connect_social::{SignalError, SocialSignalProvider};
use coast_connect_storage::{DurableStore, StorageError, StorageEvent};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub use config::StoreConfig;
pub use session::{AnonymousSession, SessionProvider, SessionUser, SharedSession};

use scheduler::Scheduler;

/// Reporter name used when nobody is signed in.
pub const ANONYMOUS_REPORTER: &str = "Anonymous";

/// Reporter id used when nobody is signed in.
pub const UNKNOWN_REPORTER_ID: &str = "unknown";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from report store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The create payload failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No report has the requested id.
    #[error("Report not found: {report_id}")]
    NotFound {
        /// The id that was looked up.
        report_id: String,
    },

    /// The durable slot could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// The collection could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The social signal provider failed.
    #[error("Social signal error: {0}")]
    Signal(#[from] SignalError),

    /// Configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is misconfigured.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct StoreInner {
    storage: Arc<dyn DurableStore>,
    session: Arc<dyn SessionProvider>,
    signals: Arc<dyn SocialSignalProvider>,
    config: StoreConfig,
    reports: RwLock<Vec<HazardReport>>,
    in_flight: AtomicUsize,
    initialized: AtomicBool,
    scheduler: Scheduler,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
    }
}

/// Marks the store as loading for as long as it is alive.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Single source of truth for the hazard report collection within one
/// process.
///
/// Cloning is cheap; clones share the same collection.
#[derive(Clone)]
pub struct ReportStore {
    inner: Arc<StoreInner>,
}

impl ReportStore {
    /// Creates a store over the given collaborators. Call
    /// [`Self::initialize`] before use.
    #[must_use]
    pub fn new(
        storage: Arc<dyn DurableStore>,
        session: Arc<dyn SessionProvider>,
        signals: Arc<dyn SocialSignalProvider>,
        config: StoreConfig,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                storage,
                session,
                signals,
                config,
                reports: RwLock::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                initialized: AtomicBool::new(false),
                scheduler: Scheduler::default(),
                listener: Mutex::new(None),
            }),
        }
    }

    /// The configuration this store was built with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Whether an initialize, create, verify, or fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    fn loading(&self) -> LoadingGuard<'_> {
        LoadingGuard::new(&self.inner.in_flight)
    }

    /// Loads the persisted collection, seeding example reports if the slot
    /// is empty, missing, or malformed, then starts listening for changes
    /// made by other handles.
    ///
    /// Only the first successful call does anything; later calls return
    /// immediately until [`Self::shutdown`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] if the slot cannot be read or the
    /// seed collection cannot be written. The store stays uninitialized and
    /// the call may be retried.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        if self.inner.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }

        let _loading = self.loading();
        let mut reports = self.inner.reports.write().await;
        if self.inner.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Subscribe before reading so no change slips between the read and
        // the listener starting.
        let events = self.inner.storage.subscribe();

        let existing = self.load().await?;
        if existing.is_empty() {
            let seed = seed::seed_reports(Utc::now());
            self.persist(&seed).await?;
            log::info!("Seeded empty report store with {} reports", seed.len());
            *reports = seed;
        } else {
            log::info!("Loaded {} persisted reports", existing.len());
            *reports = existing;
        }

        self.spawn_sync_listener(events);
        self.inner.initialized.store(true, Ordering::SeqCst);
        drop(reports);

        Ok(())
    }

    /// Creates a report from `input` and puts it at the front of the
    /// collection.
    ///
    /// The reporter is taken from the current session, falling back to
    /// [`ANONYMOUS_REPORTER`] / [`UNKNOWN_REPORTER_ID`]. A social update is
    /// scheduled after the configured delay.
    ///
    /// # Errors
    ///
    /// * [`StoreError::Validation`] if the input breaks a constraint.
    /// * [`StoreError::Persistence`] if the durable write fails. Nothing is
    ///   added in that case.
    pub async fn create_report(
        &self,
        input: &CreateReportInput,
    ) -> Result<HazardReport, StoreError> {
        let _loading = self.loading();
        let new = input.validate()?;

        let (reported_by, reporter_id) = self
            .inner
            .session
            .current_user()
            .map_or_else(
                || {
                    (
                        ANONYMOUS_REPORTER.to_string(),
                        UNKNOWN_REPORTER_ID.to_string(),
                    )
                },
                |user| {
                    let name = if user.display_name.trim().is_empty() {
                        ANONYMOUS_REPORTER.to_string()
                    } else {
                        user.display_name
                    };
                    let id = if user.id.trim().is_empty() {
                        UNKNOWN_REPORTER_ID.to_string()
                    } else {
                        user.id
                    };
                    (name, id)
                },
            );

        let mut reports = self.inner.reports.write().await;

        let mut id = Uuid::new_v4().simple().to_string();
        while reports.iter().any(|r| r.id == id) {
            id = Uuid::new_v4().simple().to_string();
        }

        let now = Utc::now();
        let report = HazardReport {
            id,
            title: new.title,
            description: new.description,
            hazard_type: new.hazard_type,
            severity: new.severity,
            location: new.location,
            reported_by,
            reporter_id,
            status: ReportStatus::Pending,
            verified_by: None,
            verification_notes: None,
            created_at: now,
            updated_at: now,
            images: new.images,
            social_mentions: SocialMentions::default(),
            social_correlation: SocialCorrelation::zeroed(now),
        };

        let mut next = Vec::with_capacity(reports.len() + 1);
        next.push(report.clone());
        next.extend(reports.iter().cloned());

        self.persist(&next).await?;
        *reports = next;
        drop(reports);

        log::info!(
            "Created report {} ({} / {}) by {}",
            report.id,
            report.hazard_type,
            report.severity,
            report.reported_by
        );

        self.schedule_social_update(&report.id);

        Ok(report)
    }

    /// Sets a report's verification state, verifier, and notes.
    ///
    /// `verified_by` and `notes` replace the previous values, so passing
    /// `None` clears them.
    ///
    /// # Errors
    ///
    /// * [`StoreError::NotFound`] if no report has `verification.report_id`.
    ///   No report is modified.
    /// * [`StoreError::Persistence`] if the durable write fails.
    pub async fn verify_report(
        &self,
        verification: &ReportVerification,
    ) -> Result<HazardReport, StoreError> {
        let _loading = self.loading();
        let mut reports = self.inner.reports.write().await;

        let index = position_of(&reports, &verification.report_id)?;

        let mut next = reports.clone();
        let report = &mut next[index];
        let previous = report.status;
        report.status = verification.status;
        report.verified_by.clone_from(&verification.verified_by);
        report.verification_notes.clone_from(&verification.notes);
        report.updated_at = advance(report.updated_at, Utc::now());
        let updated = report.clone();

        self.persist(&next).await?;
        *reports = next;
        drop(reports);

        log::info!(
            "Report {} moved from {previous} to {}",
            updated.id,
            updated.status
        );

        Ok(updated)
    }

    /// Replaces the in-memory collection with what is currently persisted.
    ///
    /// A malformed or missing slot loads as an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] if the slot cannot be read. The
    /// in-memory collection is unchanged in that case.
    pub async fn fetch_reports(&self) -> Result<(), StoreError> {
        let _loading = self.loading();
        self.reload().await
    }

    /// Snapshot of the full collection, newest first.
    pub async fn reports(&self) -> Vec<HazardReport> {
        self.inner.reports.read().await.clone()
    }

    /// Looks up a single report.
    pub async fn get_report(&self, report_id: &str) -> Option<HazardReport> {
        self.inner
            .reports
            .read()
            .await
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
    }

    /// Reports with the given status, in collection order.
    pub async fn get_reports_by_status(&self, status: ReportStatus) -> Vec<HazardReport> {
        self.filter(|r| r.status == status).await
    }

    /// Number of reports awaiting review.
    pub async fn get_pending_reports_count(&self) -> usize {
        self.inner
            .reports
            .read()
            .await
            .iter()
            .filter(|r| r.status == ReportStatus::Pending)
            .count()
    }

    /// Reports with more than
    /// [`coast_connect_report_models::HIGH_ACTIVITY_THRESHOLD`] mentions or
    /// that are trending, in collection order.
    pub async fn get_reports_with_high_social_activity(&self) -> Vec<HazardReport> {
        self.filter(HazardReport::has_high_social_activity).await
    }

    /// Trending reports, in collection order.
    pub async fn get_trending_reports(&self) -> Vec<HazardReport> {
        self.filter(HazardReport::is_trending).await
    }

    async fn filter(&self, predicate: impl Fn(&HazardReport) -> bool) -> Vec<HazardReport> {
        self.inner
            .reports
            .read()
            .await
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Recomputes a report's social mentions and correlation from the
    /// signal provider and persists the result.
    ///
    /// Only the target report's social records change; `updated_at` is left
    /// alone because social data is derived rather than edited. Any failure
    /// is logged and leaves the report as it was.
    pub async fn update_social_mentions(&self, report_id: &str) {
        if let Err(e) = self.try_update_social_mentions(report_id).await {
            log::error!("Failed to update social mentions for report {report_id}: {e}");
        }
    }

    async fn try_update_social_mentions(&self, report_id: &str) -> Result<(), StoreError> {
        // Computed before taking the lock; the provider may be slow.
        let signals = self.inner.signals.compute_signals(report_id).await?;

        let mut reports = self.inner.reports.write().await;
        let index = position_of(&reports, report_id)?;

        let mut next = reports.clone();
        let report = &mut next[index];
        report.social_mentions.replace_with(signals.mentions);
        report.social_correlation = signals.correlation;

        self.persist(&next).await?;
        *reports = next;
        drop(reports);

        log::debug!("Updated social signals for report {report_id}");
        Ok(())
    }

    /// Aborts the scheduled social update for `report_id`. Returns whether
    /// one was pending.
    pub fn cancel_social_update(&self, report_id: &str) -> bool {
        self.inner.scheduler.cancel(report_id)
    }

    /// Number of scheduled social updates that have not run yet.
    #[must_use]
    pub fn pending_social_updates(&self) -> usize {
        self.inner.scheduler.pending()
    }

    /// Stops listening for storage changes and aborts every scheduled
    /// social update.
    ///
    /// The in-memory collection stays readable. A later
    /// [`Self::initialize`] reloads from storage and starts listening again.
    pub fn shutdown(&self) {
        self.inner.initialized.store(false, Ordering::SeqCst);
        self.inner.scheduler.cancel_all();
        if let Some(listener) = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
            log::debug!("Stopped storage sync listener");
        }
    }

    fn schedule_social_update(&self, report_id: &str) {
        let Some(delay) = self.inner.config.social_update_delay else {
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        let id = report_id.to_string();

        self.inner
            .scheduler
            .schedule(report_id, delay, move |generation| async move {
                let Some(inner) = Weak::upgrade(&weak) else {
                    return;
                };
                let store = Self { inner };
                store.update_social_mentions(&id).await;
                store.inner.scheduler.finish(&id, generation);
            });
    }

    fn spawn_sync_listener(&self, mut events: broadcast::Receiver<StorageEvent>) {
        let origin = self.inner.storage.origin();
        let key = self.inner.config.storage_key.clone();
        let weak = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == key && event.is_foreign_to(origin) => {
                        log::debug!("Slot '{key}' changed by {}; reloading", event.origin);
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Missed {skipped} storage events; reloading");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                let Some(inner) = Weak::upgrade(&weak) else {
                    break;
                };
                if let Err(e) = (Self { inner }).reload().await {
                    log::error!("Failed to reload reports after external change: {e}");
                }
            }
        });

        if let Some(previous) = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }
    }

    async fn reload(&self) -> Result<(), StoreError> {
        let mut reports = self.inner.reports.write().await;
        let loaded = self.load().await?;
        log::debug!("Reloaded {} reports from storage", loaded.len());
        *reports = loaded;
        drop(reports);
        Ok(())
    }

    async fn load(&self) -> Result<Vec<HazardReport>, StoreError> {
        let raw = self
            .inner
            .storage
            .read(&self.inner.config.storage_key)
            .await?;
        Ok(raw.map_or_else(Vec::new, |raw| decode_reports(&raw)))
    }

    async fn persist(&self, reports: &[HazardReport]) -> Result<(), StoreError> {
        let encoded = encode_reports(reports)?;
        self.inner
            .storage
            .write(&self.inner.config.storage_key, &encoded)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Serializes a collection into the slot format.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if a report cannot be encoded.
pub fn encode_reports(reports: &[HazardReport]) -> Result<String, serde_json::Error> {
    serde_json::to_string(reports)
}

/// Parses the slot format. Malformed input decodes as an empty collection.
#[must_use]
pub fn decode_reports(raw: &str) -> Vec<HazardReport> {
    match serde_json::from_str(raw) {
        Ok(reports) => reports,
        Err(e) => {
            log::warn!("Persisted reports are malformed, treating as empty: {e}");
            Vec::new()
        }
    }
}

fn position_of(reports: &[HazardReport], report_id: &str) -> Result<usize, StoreError> {
    reports
        .iter()
        .position(|r| r.id == report_id)
        .ok_or_else(|| StoreError::NotFound {
            report_id: report_id.to_string(),
        })
}

/// Returns `now`, or one millisecond past `previous` if the clock has not
/// moved past it.
fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + TimeDelta::milliseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use coast_connect_report_models::{HazardType, ImageRef, Location, Severity};
    use coast_connect_social::{FixedSignalProvider, SocialSignals};
    use coast_connect_storage::OriginId;
    use coast_connect_storage::memory::{MemoryBackend, MemoryStore};
    use tokio::sync::Notify;

    use super::*;

    struct FailingSignals;

    #[async_trait]
    impl SocialSignalProvider for FailingSignals {
        async fn compute_signals(&self, _report_id: &str) -> Result<SocialSignals, SignalError> {
            Err(SignalError::Unavailable {
                message: "analytics offline".to_string(),
            })
        }
    }

    /// Memory storage whose writes can be held until released.
    struct GatedStore {
        inner: MemoryStore,
        gated: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl GatedStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                gated: AtomicBool::new(false),
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl DurableStore for GatedStore {
        fn origin(&self) -> OriginId {
            self.inner.origin()
        }

        async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.gated.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.write(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }

        fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
            self.inner.subscribe()
        }
    }

    fn fixed_signals() -> SocialSignals {
        SocialSignals {
            mentions: SocialMentions {
                total: 42,
                recent: 7,
                trending: true,
                keywords: vec!["hazard".to_string()],
                influencer_mentions: 2,
                ..SocialMentions::default()
            },
            correlation: SocialCorrelation::new(0.65, 9, 1, Utc::now()),
        }
    }

    fn quiet_config() -> StoreConfig {
        StoreConfig::default().with_social_update_delay(None)
    }

    fn store_with(
        storage: MemoryStore,
        session: Arc<dyn SessionProvider>,
        signals: Arc<dyn SocialSignalProvider>,
        config: StoreConfig,
    ) -> ReportStore {
        ReportStore::new(Arc::new(storage), session, signals, config)
    }

    fn anonymous_store(backend: &MemoryBackend) -> ReportStore {
        store_with(
            backend.connect(),
            Arc::new(AnonymousSession),
            Arc::new(FixedSignalProvider::new(fixed_signals())),
            quiet_config(),
        )
    }

    fn flood_input() -> CreateReportInput {
        CreateReportInput {
            title: "Flood".to_string(),
            description: "...".to_string(),
            hazard_type: "flood".to_string(),
            severity: "high".to_string(),
            location: Location::new(10.0, 20.0),
            images: None,
        }
    }

    async fn persisted(backend: &MemoryBackend) -> Vec<HazardReport> {
        let raw = backend.peek(DEFAULT_KEY).await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    const DEFAULT_KEY: &str = config::DEFAULT_STORAGE_KEY;

    #[tokio::test]
    async fn initialize_seeds_empty_storage() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);

        store.initialize().await.unwrap();

        let reports = store.reports().await;
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        let statuses: Vec<ReportStatus> = reports.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                ReportStatus::Pending,
                ReportStatus::Verified,
                ReportStatus::Investigating
            ]
        );

        assert_eq!(persisted(&backend).await, reports);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn initialize_keeps_existing_reports() {
        let backend = MemoryBackend::new();
        let first = anonymous_store(&backend);
        first.initialize().await.unwrap();
        let created = first.create_report(&flood_input()).await.unwrap();
        first.shutdown();

        let second = anonymous_store(&backend);
        second.initialize().await.unwrap();

        let reports = second.reports().await;
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].id, created.id);
    }

    #[tokio::test]
    async fn initialize_is_a_noop_after_first_call() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        let created = store.create_report(&flood_input()).await.unwrap();

        backend.set_fail_writes(true);
        store.initialize().await.unwrap();

        let reports = store.reports().await;
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].id, created.id);
    }

    #[tokio::test]
    async fn initialize_after_shutdown_reloads_and_resumes_sync() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        store.shutdown();

        let other = anonymous_store(&backend);
        other.initialize().await.unwrap();
        let missed = other.create_report(&flood_input()).await.unwrap();
        tokio::task::yield_now().await;
        assert!(store.get_report(&missed.id).await.is_none());

        store.initialize().await.unwrap();
        assert!(store.get_report(&missed.id).await.is_some());

        let later = other.create_report(&flood_input()).await.unwrap();
        let mut seen = false;
        for _ in 0..100 {
            if store.get_report(&later.id).await.is_some() {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen, "restarted store never observed the new report");
    }

    #[tokio::test]
    async fn malformed_storage_is_treated_as_empty() {
        let backend = MemoryBackend::new();
        backend
            .connect()
            .write(DEFAULT_KEY, "{not json")
            .await
            .unwrap();

        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        assert_eq!(store.reports().await.len(), 3);

        backend
            .connect()
            .write(DEFAULT_KEY, "garbage")
            .await
            .unwrap();
        store.fetch_reports().await.unwrap();
        assert!(store.reports().await.is_empty());
    }

    #[tokio::test]
    async fn initialize_failure_can_be_retried() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);

        backend.set_fail_writes(true);
        assert!(matches!(
            store.initialize().await,
            Err(StoreError::Persistence(_))
        ));
        assert!(store.reports().await.is_empty());

        backend.set_fail_writes(false);
        store.initialize().await.unwrap();
        assert_eq!(store.reports().await.len(), 3);
    }

    #[tokio::test]
    async fn create_report_without_session_uses_defaults() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();

        let report = store.create_report(&flood_input()).await.unwrap();

        assert_eq!(report.reported_by, "Anonymous");
        assert_eq!(report.reporter_id, "unknown");
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.hazard_type, HazardType::Flood);
        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.created_at, report.updated_at);
        assert_eq!(report.social_mentions, SocialMentions::default());
        assert!(report.social_correlation.score().abs() < f64::EPSILON);
        assert_eq!(report.social_correlation.verified_correlations, 0);
        assert_eq!(report.images, None);
        assert!(!["1", "2", "3"].contains(&report.id.as_str()));

        let reports = store.reports().await;
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0], report);
        assert_eq!(persisted(&backend).await, reports);
    }

    #[tokio::test]
    async fn create_report_uses_session_user() {
        let backend = MemoryBackend::new();
        let session = Arc::new(SharedSession::signed_in(SessionUser::new(
            "user_42",
            "Lifeguard Priya",
        )));
        let store = store_with(
            backend.connect(),
            session.clone(),
            Arc::new(FixedSignalProvider::new(fixed_signals())),
            quiet_config(),
        );
        store.initialize().await.unwrap();

        let report = store.create_report(&flood_input()).await.unwrap();
        assert_eq!(report.reported_by, "Lifeguard Priya");
        assert_eq!(report.reporter_id, "user_42");

        session.sign_out();
        let report = store.create_report(&flood_input()).await.unwrap();
        assert_eq!(report.reported_by, "Anonymous");
    }

    #[tokio::test]
    async fn create_report_inserts_newest_first_with_unique_ids() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();

        let first = store.create_report(&flood_input()).await.unwrap();
        let second = store
            .create_report(&CreateReportInput {
                title: "Rip current".to_string(),
                hazard_type: "rip_current".to_string(),
                images: Some(vec![
                    ImageRef::from("beach.jpg"),
                    ImageRef::File {
                        name: Some("flag.png".to_string()),
                    },
                ]),
                ..flood_input()
            })
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(
            second.images,
            Some(vec!["beach.jpg".to_string(), "flag.png".to_string()])
        );

        let ids: Vec<String> = store.reports().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, [second.id, first.id, "1".into(), "2".into(), "3".into()]);
    }

    #[tokio::test]
    async fn create_report_rejects_invalid_input() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();

        let err = store
            .create_report(&CreateReportInput {
                severity: "catastrophic".to_string(),
                ..flood_input()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidSeverity { .. })
        ));

        let err = store
            .create_report(&CreateReportInput {
                title: String::new(),
                ..flood_input()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        assert_eq!(store.reports().await.len(), 3);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_unchanged() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        let before = store.reports().await;

        backend.set_fail_writes(true);

        let err = store.create_report(&flood_input()).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));

        let err = store
            .verify_report(&ReportVerification {
                report_id: "1".to_string(),
                status: ReportStatus::Verified,
                verified_by: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));

        assert_eq!(store.reports().await, before);
        assert_eq!(persisted(&backend).await, before);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn verify_report_updates_only_the_target() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        let before = store.reports().await;
        let prior = store.get_report("2").await.unwrap();

        let updated = store
            .verify_report(&ReportVerification {
                report_id: "2".to_string(),
                status: ReportStatus::Rejected,
                verified_by: Some("QA".to_string()),
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, ReportStatus::Rejected);
        assert_eq!(updated.verified_by.as_deref(), Some("QA"));
        assert_eq!(updated.verification_notes, None);
        assert!(updated.updated_at > prior.updated_at);
        assert_eq!(updated.created_at, prior.created_at);

        let after = store.reports().await;
        assert_eq!(after[1], updated);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
        assert_eq!(persisted(&backend).await, after);
    }

    #[tokio::test]
    async fn verify_report_always_advances_updated_at() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();

        let mut last = store.get_report("1").await.unwrap().updated_at;
        for status in [
            ReportStatus::Investigating,
            ReportStatus::Verified,
            ReportStatus::Verified,
            ReportStatus::Pending,
        ] {
            let updated = store
                .verify_report(&ReportVerification {
                    report_id: "1".to_string(),
                    status,
                    verified_by: Some("Duty Officer".to_string()),
                    notes: Some("checked".to_string()),
                })
                .await
                .unwrap();
            assert_eq!(updated.status, status);
            assert!(updated.updated_at > last);
            last = updated.updated_at;
        }
    }

    #[tokio::test]
    async fn verify_unknown_report_is_not_found() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        let before = store.reports().await;

        let err = store
            .verify_report(&ReportVerification {
                report_id: "does-not-exist".to_string(),
                status: ReportStatus::Verified,
                verified_by: Some("QA".to_string()),
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err, StoreError::NotFound { ref report_id } if report_id == "does-not-exist")
        );
        assert_eq!(store.reports().await, before);
        assert_eq!(persisted(&backend).await, before);
    }

    #[tokio::test]
    async fn fetch_reports_is_idempotent() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        store.create_report(&flood_input()).await.unwrap();

        let before = encode_reports(&store.reports().await).unwrap();
        store.fetch_reports().await.unwrap();
        store.fetch_reports().await.unwrap();
        let after = encode_reports(&store.reports().await).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn encode_decode_round_trip() {
        let reports = seed::seed_reports(Utc::now());
        let encoded = encode_reports(&reports).unwrap();
        assert_eq!(decode_reports(&encoded), reports);
        assert!(decode_reports("[{\"id\": 1}]").is_empty());
    }

    #[tokio::test]
    async fn filters_preserve_collection_order() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();

        assert_eq!(store.get_pending_reports_count().await, 1);

        let a = store.create_report(&flood_input()).await.unwrap();
        let b = store.create_report(&flood_input()).await.unwrap();
        assert_eq!(store.get_pending_reports_count().await, 3);

        let pending: Vec<String> = store
            .get_reports_by_status(ReportStatus::Pending)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(pending, [b.id.clone(), a.id.clone(), "1".to_string()]);

        let verified = store.get_reports_by_status(ReportStatus::Verified).await;
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, "2");
        assert!(
            store
                .get_reports_by_status(ReportStatus::Rejected)
                .await
                .is_empty()
        );

        // Seed report 1 is trending with 156 mentions, report 2 has 89.
        let high: Vec<String> = store
            .get_reports_with_high_social_activity()
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(high, ["1", "2"]);

        // Fixed signals mark the report as trending with 42 mentions.
        store.update_social_mentions(&a.id).await;
        let trending: Vec<String> = store
            .get_trending_reports()
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(trending, [a.id.clone(), "1".to_string()]);

        let high: Vec<String> = store
            .get_reports_with_high_social_activity()
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(high, [a.id, "1".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn social_update_replaces_only_target_social_records() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();
        let before = store.reports().await;

        store.update_social_mentions("1").await;

        let after = store.reports().await;
        let updated = &after[0];
        let expected = fixed_signals();
        assert_eq!(updated.social_mentions.total, expected.mentions.total);
        assert_eq!(updated.social_mentions.keywords, expected.mentions.keywords);
        // Peak time survives because the new signals carry none.
        assert_eq!(
            updated.social_mentions.peak_time,
            before[0].social_mentions.peak_time
        );
        assert_eq!(
            updated.social_correlation.verified_correlations,
            expected.correlation.verified_correlations
        );
        assert_eq!(updated.updated_at, before[0].updated_at);
        assert_eq!(updated.status, before[0].status);
        assert_eq!(&after[1..], &before[1..]);
        assert_eq!(persisted(&backend).await, after);
    }

    #[tokio::test]
    async fn social_update_failures_are_swallowed() {
        let backend = MemoryBackend::new();
        let store = store_with(
            backend.connect(),
            Arc::new(AnonymousSession),
            Arc::new(FailingSignals),
            quiet_config(),
        );
        store.initialize().await.unwrap();
        let before = store.reports().await;

        store.update_social_mentions("1").await;
        assert_eq!(store.reports().await, before);

        let healthy = anonymous_store(&backend);
        healthy.initialize().await.unwrap();
        healthy.update_social_mentions("no-such-report").await;

        backend.set_fail_writes(true);
        healthy.update_social_mentions("1").await;
        assert_eq!(healthy.reports().await, before);
    }

    #[tokio::test]
    async fn provider_scores_are_clamped_before_persisting() {
        for score in [1.5, -0.3, f64::NAN, f64::INFINITY] {
            let backend = MemoryBackend::new();
            let signals = SocialSignals {
                correlation: SocialCorrelation::new(score, 4, 0, Utc::now()),
                ..fixed_signals()
            };
            let store = store_with(
                backend.connect(),
                Arc::new(AnonymousSession),
                Arc::new(FixedSignalProvider::new(signals)),
                quiet_config(),
            );
            store.initialize().await.unwrap();
            let created = store.create_report(&flood_input()).await.unwrap();

            store.update_social_mentions(&created.id).await;

            let updated = store.get_report(&created.id).await.unwrap();
            assert!((0.0..=1.0).contains(&updated.social_correlation.score()));

            let raw = backend.peek(DEFAULT_KEY).await.unwrap();
            assert!(!raw.contains("\"score\":null"), "score {score} encoded as null");

            store.fetch_reports().await.unwrap();
            assert_eq!(store.reports().await.len(), 4);

            let fresh = anonymous_store(&backend);
            fresh.initialize().await.unwrap();
            assert_eq!(fresh.get_report(&created.id).await, Some(updated));
        }
    }

    #[tokio::test]
    async fn is_loading_tracks_overlapping_operations() {
        let backend = MemoryBackend::new();
        let storage = Arc::new(GatedStore::new(backend.connect()));
        let store = ReportStore::new(
            storage.clone(),
            Arc::new(AnonymousSession),
            Arc::new(FixedSignalProvider::new(fixed_signals())),
            quiet_config(),
        );
        store.initialize().await.unwrap();
        assert!(!store.is_loading());

        storage.gated.store(true, Ordering::SeqCst);

        let creating = tokio::spawn({
            let store = store.clone();
            async move { store.create_report(&flood_input()).await }
        });
        storage.entered.notified().await;
        assert!(store.is_loading());

        let verifying = tokio::spawn({
            let store = store.clone();
            async move {
                store
                    .verify_report(&ReportVerification {
                        report_id: "1".to_string(),
                        status: ReportStatus::Investigating,
                        verified_by: None,
                        notes: None,
                    })
                    .await
            }
        });
        tokio::task::yield_now().await;

        storage.release.notify_one();
        creating.await.unwrap().unwrap();

        // The verification now holds the lock and is stalled in its write.
        storage.entered.notified().await;
        assert!(store.is_loading());

        storage.release.notify_one();
        verifying.await.unwrap().unwrap();
        assert!(!store.is_loading());
        assert_eq!(store.reports().await.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_social_update_runs_after_delay() {
        let backend = MemoryBackend::new();
        let store = store_with(
            backend.connect(),
            Arc::new(AnonymousSession),
            Arc::new(FixedSignalProvider::new(fixed_signals())),
            StoreConfig::default(),
        );
        store.initialize().await.unwrap();

        let report = store.create_report(&flood_input()).await.unwrap();
        assert_eq!(store.pending_social_updates(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(
            store.get_report(&report.id).await.unwrap().social_mentions,
            SocialMentions::default()
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        let updated = store.get_report(&report.id).await.unwrap();
        assert_eq!(updated.social_mentions.total, 42);
        assert!(updated.is_trending());
        assert_eq!(store.pending_social_updates(), 0);
        assert_eq!(persisted(&backend).await[0], updated);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_social_update_never_runs() {
        let backend = MemoryBackend::new();
        let store = store_with(
            backend.connect(),
            Arc::new(AnonymousSession),
            Arc::new(FixedSignalProvider::new(fixed_signals())),
            StoreConfig::default(),
        );
        store.initialize().await.unwrap();

        let first = store.create_report(&flood_input()).await.unwrap();
        let second = store.create_report(&flood_input()).await.unwrap();
        assert_eq!(store.pending_social_updates(), 2);

        assert!(store.cancel_social_update(&first.id));
        store.shutdown();
        assert_eq!(store.pending_social_updates(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        for id in [&first.id, &second.id] {
            assert_eq!(
                store.get_report(id).await.unwrap().social_mentions,
                SocialMentions::default()
            );
        }
    }

    #[tokio::test]
    async fn other_handles_see_changes_after_notification() {
        let backend = MemoryBackend::new();
        let tab_a = anonymous_store(&backend);
        let tab_b = anonymous_store(&backend);
        tab_a.initialize().await.unwrap();
        tab_b.initialize().await.unwrap();

        let created = tab_a.create_report(&flood_input()).await.unwrap();

        let mut seen = false;
        for _ in 0..100 {
            if tab_b.get_report(&created.id).await.is_some() {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen, "second handle never observed the new report");
        assert_eq!(tab_b.reports().await, tab_a.reports().await);

        tab_b
            .verify_report(&ReportVerification {
                report_id: created.id.clone(),
                status: ReportStatus::Investigating,
                verified_by: Some("Coast Guard".to_string()),
                notes: None,
            })
            .await
            .unwrap();

        let mut synced = false;
        for _ in 0..100 {
            let status = tab_a.get_report(&created.id).await.map(|r| r.status);
            if status == Some(ReportStatus::Investigating) {
                synced = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(synced, "first handle never observed the verification");
    }

    #[tokio::test]
    async fn cleared_slot_reloads_as_empty() {
        let backend = MemoryBackend::new();
        let store = anonymous_store(&backend);
        store.initialize().await.unwrap();

        backend.connect().remove(DEFAULT_KEY).await.unwrap();

        for _ in 0..100 {
            if store.reports().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.reports().await.is_empty());
        assert_eq!(store.get_pending_reports_count().await, 0);
    }

    #[test]
    fn advance_is_strictly_increasing() {
        let now = Utc::now();
        assert_eq!(advance(now - TimeDelta::seconds(5), now), now);
        assert_eq!(advance(now, now), now + TimeDelta::milliseconds(1));
        assert!(advance(now + TimeDelta::seconds(5), now) > now + TimeDelta::seconds(5));
    }
}
