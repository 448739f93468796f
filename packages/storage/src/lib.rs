#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Durable key-value slots with cross-handle change notifications.
//!
//! A [`DurableStore`] is one handle onto a shared backend, the way a browser
//! tab is one handle onto local storage. Every write or removal is broadcast
//! as a [`StorageEvent`] tagged with the writer's [`OriginId`]; handles
//! ignore events carrying their own origin, so a handle only hears about
//! changes made by someone else.
//!
//! Two backends are provided:
//! - [`memory::MemoryBackend`] keeps slots in memory and is used for tests
//!   and for simulating several processes inside one.
//! - [`file::FileBackend`] keeps one JSON file per slot under a data
//!   directory, with an optional polling watcher that notices writes made
//!   by other OS processes.

pub mod file;
pub mod memory;
pub mod paths;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of each backend's change-notification channel.
///
/// A receiver that falls further behind than this gets
/// [`broadcast::error::RecvError::Lagged`] and should reload everything.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors from durable storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be mapped onto the backend.
    #[error("Invalid storage key '{key}'")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// The backend refused the operation.
    #[error("Storage unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },
}

/// Identifies the handle that produced a [`StorageEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OriginId(Uuid);

impl OriginId {
    /// A fresh, unique origin.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The origin used for changes detected on disk whose writer is
    /// unknown (another OS process).
    #[must_use]
    pub const fn external() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for OriginId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OriginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What happened to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The slot was written.
    Written,
    /// The slot was removed.
    Removed,
}

/// Notification that a slot changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The slot that changed.
    pub key: String,
    /// Handle that made the change.
    pub origin: OriginId,
    /// Whether the slot was written or removed.
    pub kind: ChangeKind,
}

impl StorageEvent {
    /// Whether this event was produced by a handle other than `origin`.
    #[must_use]
    pub fn is_foreign_to(&self, origin: OriginId) -> bool {
        self.origin != origin
    }
}

/// A handle onto a durable key-value backend.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// The origin stamped on events this handle produces.
    fn origin(&self) -> OriginId;

    /// Reads a slot. Returns `None` if the slot has never been written or
    /// was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the contents of a slot and notifies other handles.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write is not durably committed.
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a slot and notifies other handles.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the removal fails.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribes to change notifications from every handle on the same
    /// backend, including this one. Filter with
    /// [`StorageEvent::is_foreign_to`].
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

/// Publishes an event, ignoring the case where nobody is listening.
fn publish(events: &broadcast::Sender<StorageEvent>, event: StorageEvent) {
    log::trace!(
        "Storage event {:?} on '{}' from {}",
        event.kind,
        event.key,
        event.origin
    );
    // `send` only fails when there are no receivers
    let _ = events.send(event);
}
