//! Persisted key/value storage shared across client contexts
//!
//! This module models the client's persisted storage: a flat string
//! key/value map that survives restarts (through an optional snapshot
//! file) and is shared by every context ("tab") attached to it. Writes
//! replace whole values, and every tracked write emits a change event
//! that is delivered to all contexts except the one that performed the
//! write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Configuration for persisted storage
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path of the JSON snapshot file; storage is purely in-memory when unset
    pub snapshot_path: Option<PathBuf>,
    /// Capacity of the change-event channel
    pub event_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            snapshot_path: None,
            event_capacity: 64,
        }
    }
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STORAGE_SNAPSHOT_PATH`: snapshot file path (default: in-memory only)
    /// - `STORAGE_EVENT_CAPACITY`: change-event channel capacity (default: 64)
    pub fn from_env() -> Result<Self> {
        let snapshot_path = std::env::var("STORAGE_SNAPSHOT_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let event_capacity = std::env::var("STORAGE_EVENT_CAPACITY")
            .unwrap_or_else(|_| "64".to_string())
            .parse()
            .unwrap_or(64);

        Ok(StorageConfig {
            snapshot_path,
            event_capacity,
        })
    }
}

/// Change event emitted when a context mutates storage
///
/// The event is delivered to every subscribed context except the writer,
/// mirroring how cross-context storage notifications behave.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    /// Key that changed
    pub key: String,
    /// New value, or `None` when the key was removed
    pub new_value: Option<String>,
    writer: Uuid,
}

struct StorageInner {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    snapshot_path: Option<PathBuf>,
}

/// Persisted key/value storage shared by all attached contexts
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<StorageInner>,
}

impl SharedStorage {
    /// Open storage with the given configuration, loading the snapshot
    /// file when one is configured and present
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        let entries = match &config.snapshot_path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path).map_err(StorageError::Read)?;
                match serde_json::from_str::<HashMap<String, String>>(&raw) {
                    Ok(entries) => {
                        info!("Loaded {} storage entries from {}", entries.len(), path.display());
                        entries
                    }
                    Err(e) => {
                        // Best-effort mirror: a corrupt snapshot starts empty
                        warn!("Storage snapshot at {} is unreadable, starting empty: {}", path.display(), e);
                        HashMap::new()
                    }
                }
            }
            _ => HashMap::new(),
        };

        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Ok(SharedStorage {
            inner: Arc::new(StorageInner {
                entries: Mutex::new(entries),
                events,
                snapshot_path: config.snapshot_path.clone(),
            }),
        })
    }

    /// Open purely in-memory storage with default settings
    pub fn in_memory() -> Self {
        let config = StorageConfig::default();
        let (events, _) = broadcast::channel(config.event_capacity);

        SharedStorage {
            inner: Arc::new(StorageInner {
                entries: Mutex::new(HashMap::new()),
                events,
                snapshot_path: None,
            }),
        }
    }

    /// Attach a new context ("tab") to this storage
    pub fn context(&self) -> StorageContext {
        StorageContext {
            storage: self.clone(),
            context_id: Uuid::new_v4(),
        }
    }

    /// Write a value without emitting a change event
    ///
    /// Models code paths that mutate persisted storage outside the
    /// change-notification bus; readers only observe such writes on
    /// their next explicit read (e.g. a repair-timer pass).
    pub fn set_untracked(&self, key: &str, value: &str) {
        let mut entries = self.lock_entries();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    /// Remove a value without emitting a change event
    pub fn remove_untracked(&self, key: &str) {
        let mut entries = self.lock_entries();
        entries.remove(key);
        self.persist(&entries);
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        if let Some(path) = &self.inner.snapshot_path {
            if let Err(e) = self.write_snapshot(path, entries) {
                warn!("Failed to persist storage snapshot: {}", e);
            }
        }
    }

    fn write_snapshot(&self, path: &Path, entries: &HashMap<String, String>) -> StorageResult<()> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| StorageError::Configuration(e.to_string()))?;
        std::fs::write(path, raw).map_err(StorageError::Write)?;
        Ok(())
    }
}

/// A single context ("tab") attached to shared storage
///
/// Cloning a context keeps the same identity, so clones behave as extra
/// handles inside the same tab rather than as a new tab.
#[derive(Clone)]
pub struct StorageContext {
    storage: SharedStorage,
    context_id: Uuid,
}

impl StorageContext {
    /// Read the value stored under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.storage.lock_entries().get(key).cloned()
    }

    /// Replace the value stored under `key`
    ///
    /// Emits a change event to every other context when the stored value
    /// actually changes.
    pub fn set(&self, key: &str, value: &str) {
        let changed = {
            let mut entries = self.storage.lock_entries();
            let previous = entries.insert(key.to_string(), value.to_string());
            let changed = previous.as_deref() != Some(value);
            if changed {
                self.storage.persist(&entries);
            }
            changed
        };

        if changed {
            self.notify(key, Some(value.to_string()));
        }
    }

    /// Remove the value stored under `key`; a no-op when absent
    pub fn remove(&self, key: &str) {
        let removed = {
            let mut entries = self.storage.lock_entries();
            let removed = entries.remove(key).is_some();
            if removed {
                self.storage.persist(&entries);
            }
            removed
        };

        if removed {
            self.notify(key, None);
        }
    }

    /// Subscribe to changes made by other contexts
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            rx: self.storage.inner.events.subscribe(),
            context_id: self.context_id,
        }
    }

    /// Identity of this context
    pub fn context_id(&self) -> Uuid {
        self.context_id
    }

    /// The storage this context is attached to
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    fn notify(&self, key: &str, new_value: Option<String>) {
        // Send fails only when nobody is subscribed, which is fine
        let _ = self.storage.inner.events.send(StorageEvent {
            key: key.to_string(),
            new_value,
            writer: self.context_id,
        });
    }
}

/// Stream of change events scoped to one subscribing context
pub struct StorageEvents {
    rx: broadcast::Receiver<StorageEvent>,
    context_id: Uuid,
}

impl StorageEvents {
    /// Receive the next change made by another context
    ///
    /// Events written by the subscribing context itself are skipped. A
    /// lagged receiver drops the missed events and keeps going; `None`
    /// means the storage has been dropped.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.writer == self.context_id => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Storage event subscriber lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
