//! In-memory backend shared by any number of handles.
//!
//! Each [`MemoryBackend::connect`] call models a separate process or tab:
//! the handles see the same slots and hear each other's writes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::{
    ChangeKind, DurableStore, EVENT_CHANNEL_CAPACITY, OriginId, StorageError, StorageEvent,
    publish,
};

struct MemoryInner {
    slots: Mutex<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    fail_writes: AtomicBool,
}

/// Shared in-memory slot storage.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                slots: Mutex::new(BTreeMap::new()),
                events,
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Opens a new handle with its own origin.
    #[must_use]
    pub fn connect(&self) -> MemoryStore {
        MemoryStore {
            backend: self.clone(),
            origin: OriginId::new(),
        }
    }

    /// Makes every subsequent write and removal fail with
    /// [`StorageError::Unavailable`], simulating a full or read-only
    /// storage area.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reads a slot directly, bypassing any handle.
    pub async fn peek(&self, key: &str) -> Option<String> {
        self.inner.slots.lock().await.get(key).cloned()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                message: "memory backend is rejecting writes".to_string(),
            });
        }
        Ok(())
    }
}

/// One handle onto a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryStore {
    backend: MemoryBackend,
    origin: OriginId,
}

#[async_trait]
impl DurableStore for MemoryStore {
    fn origin(&self) -> OriginId {
        self.origin
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.backend.peek(key).await)
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.backend.check_writable()?;

        self.backend
            .inner
            .slots
            .lock()
            .await
            .insert(key.to_string(), value.to_string());

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
        self.backend.check_writable()?;

        self.backend.inner.slots.lock().await.remove(key);

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
