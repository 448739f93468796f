//! File-backed slots: one JSON document per key under a data directory.
//!
//! Writes go to a temp file that is renamed over the slot, so a reader
//! never sees a half-written collection. Handles connected to the same
//! [`FileBackend`] notify each other directly. Writes from other OS
//! processes are picked up by [`FileStore::spawn_watcher`], which polls the
//! slots this handle has touched and compares SHA-256 digests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use crate::paths::{ensure_dir, slot_path};
use crate::{
    ChangeKind, DurableStore, EVENT_CHANNEL_CAPACITY, OriginId, StorageError, StorageEvent,
    publish,
};

struct FileInner {
    dir: PathBuf,
    events: broadcast::Sender<StorageEvent>,
}

/// A directory of slot files.
#[derive(Clone)]
pub struct FileBackend {
    inner: Arc<FileInner>,
}

impl FileBackend {
    /// Opens (or creates) the slot directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        ensure_dir(dir)?;
        log::debug!("Opened file storage at {}", dir.display());

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(FileInner {
                dir: dir.to_path_buf(),
                events,
            }),
        })
    }

    /// The slot directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Opens a new handle with its own origin.
    #[must_use]
    pub fn connect(&self) -> FileStore {
        FileStore {
            backend: self.clone(),
            origin: OriginId::new(),
            seen: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

/// One handle onto a [`FileBackend`].
#[derive(Clone)]
pub struct FileStore {
    backend: FileBackend,
    origin: OriginId,
    /// Digest of each slot as last read or written by this handle. `None`
    /// means the slot was absent.
    seen: Arc<Mutex<BTreeMap<String, Option<String>>>>,
}

impl FileStore {
    /// Checks every slot this handle has touched for changes made outside
    /// the handle and publishes an [`OriginId::external`] event for each.
    ///
    /// Returns the number of changed slots.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if a slot file cannot be read.
    pub async fn poll_changes(&self) -> Result<usize, StorageError> {
        let mut seen = self.seen.lock().await;
        let mut changed = 0;

        for (key, last) in seen.iter_mut() {
            let path = slot_path(self.backend.dir(), key)?;
            let current = read_file(&path).await?.as_deref().map(digest);

            if *last != current {
                let kind = if current.is_some() {
                    ChangeKind::Written
                } else {
                    ChangeKind::Removed
                };
                log::debug!("Detected external change to slot '{key}'");
                *last = current;
                changed += 1;

                publish(
                    &self.backend.inner.events,
                    StorageEvent {
                        key: key.clone(),
                        origin: OriginId::external(),
                        kind,
                    },
                );
            }
        }

        Ok(changed)
    }

    /// Spawns a task that calls [`Self::poll_changes`] every `interval`.
    ///
    /// The task runs until the returned handle is aborted.
    #[must_use]
    pub fn spawn_watcher(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = store.poll_changes().await {
                    log::warn!("Storage watcher poll failed: {e}");
                }
            }
        })
    }
}

#[async_trait]
impl DurableStore for FileStore {
    fn origin(&self) -> OriginId {
        self.origin
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = slot_path(self.backend.dir(), key)?;
        let mut seen = self.seen.lock().await;

        let value = read_file(&path).await?;
        seen.insert(key.to_string(), value.as_deref().map(digest));
        Ok(value)
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = slot_path(self.backend.dir(), key)?;
        let tmp = self
            .backend
            .dir()
            .join(format!(".{key}.{}.tmp", self.origin));

        // Held across the write so the watcher never mistakes our own
        // write for an external one.
        let mut seen = self.seen.lock().await;

        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        seen.insert(key.to_string(), Some(digest(value)));
        drop(seen);

        publish(
            &self.backend.inner.events,
            StorageEvent {
                key: key.to_string(),
                origin: self.origin,
                kind: ChangeKind::Written,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = slot_path(self.backend.dir(), key)?;
        let mut seen = self.seen.lock().await;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        seen.insert(key.to_string(), None);
        drop(seen);

        publish(
            &self.backend.inner.events,
            StorageEvent {
                key: key.to_string(),
                origin: self.origin,
                kind: ChangeKind::Removed,
            },
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.backend.inner.events.subscribe()
    }
}

async fn read_file(path: &Path) -> Result<Option<String>, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}
