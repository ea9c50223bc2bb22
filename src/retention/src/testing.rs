//! In-memory [`SnapshotStore`] that records calls and can inject failures.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::store::{SnapshotStore, StoreError};

#[derive(Debug, Default)]
pub struct RecordingStore {
    snapshots: Mutex<BTreeMap<String, usize>>,
    failing_deletes: Mutex<HashSet<String>>,
    delete_calls: Mutex<Vec<String>>,
    delete_delay: Mutex<Option<Duration>>,
    fail_listing: AtomicBool,
}

impl RecordingStore {
    /// Store holding the given identifiers, one object each.
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let snapshots = ids.into_iter().map(|id| (id.into(), 1)).collect();
        Self {
            snapshots: Mutex::new(snapshots),
            ..Default::default()
        }
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub async fn fail_delete(&self, id: &str) {
        self.failing_deletes.lock().await.insert(id.to_string());
    }

    pub async fn set_objects(&self, id: &str, objects: usize) {
        self.snapshots.lock().await.insert(id.to_string(), objects);
    }

    pub async fn set_delete_delay(&self, delay: Duration) {
        *self.delete_delay.lock().await = Some(delay);
    }

    /// Identifiers passed to `delete_backup`, in call order.
    pub async fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().await.clone()
    }

    /// Identifiers still present.
    pub async fn ids(&self) -> BTreeSet<String> {
        self.snapshots.lock().await.keys().cloned().collect()
    }
}

fn injected(message: &str) -> object_store::Error {
    object_store::Error::Generic {
        store: "recording",
        source: message.to_string().into(),
    }
}

#[async_trait]
impl SnapshotStore for RecordingStore {
    async fn list_backup_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::List {
                prefix: crate::snapshot::SNAPSHOT_PREFIX.to_string(),
                source: injected("listing unavailable"),
            });
        }
        Ok(self.ids().await)
    }

    async fn delete_backup(&self, id: &str) -> Result<usize, StoreError> {
        self.delete_calls.lock().await.push(id.to_string());

        let delay = *self.delete_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_deletes.lock().await.contains(id) {
            return Err(StoreError::Delete {
                id: id.to_string(),
                source: injected("delete rejected"),
            });
        }

        Ok(self.snapshots.lock().await.remove(id).unwrap_or(0))
    }

    async fn object_count(&self, id: &str) -> Result<Option<usize>, StoreError> {
        Ok(Some(
            self.snapshots.lock().await.get(id).copied().unwrap_or(0),
        ))
    }
}
