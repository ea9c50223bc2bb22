//! Snapshot storage backends.
//!
//! The executor only needs two operations: listing the snapshot prefixes and
//! deleting everything below one of them. [`ObjectStoreSnapshotStore`] provides
//! both on top of any `object_store` backend (S3, local filesystem, memory).

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::snapshot::SNAPSHOT_PREFIX;

/// Storage holding snapshot prefixes.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Distinct prefixes directly under the snapshot namespace, each with a
    /// trailing `/`. Must be a complete listing.
    async fn list_backup_ids(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Delete every object under `id` and return how many were removed.
    /// A prefix that no longer exists yields `Ok(0)`.
    async fn delete_backup(&self, id: &str) -> Result<usize, StoreError>;

    /// Number of objects under `id`, if the backend can count them cheaply.
    /// Only used for dry-run reporting.
    async fn object_count(&self, _id: &str) -> Result<Option<usize>, StoreError> {
        Ok(None)
    }
}

/// Errors returned by a [`SnapshotStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to list snapshots under '{prefix}': {source}")]
    List {
        prefix: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Failed to delete snapshot '{id}': {source}")]
    Delete {
        id: String,
        #[source]
        source: object_store::Error,
    },
}

/// [`SnapshotStore`] over an `object_store` backend.
#[derive(Debug, Clone)]
pub struct ObjectStoreSnapshotStore {
    object_store: Arc<dyn ObjectStore>,
    root: ObjectPath,
}

impl ObjectStoreSnapshotStore {
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            object_store,
            root: ObjectPath::from(SNAPSHOT_PREFIX.trim_end_matches('/')),
        }
    }

    /// Ids come from `Path` display and are already percent-encoded, so they
    /// are parsed rather than encoded again.
    fn snapshot_path(id: &str) -> Result<ObjectPath, object_store::Error> {
        Ok(ObjectPath::parse(id.trim_end_matches('/'))?)
    }

    fn list_error(&self, source: object_store::Error) -> StoreError {
        StoreError::List {
            prefix: SNAPSHOT_PREFIX.to_string(),
            source,
        }
    }
}

#[async_trait]
impl SnapshotStore for ObjectStoreSnapshotStore {
    async fn list_backup_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        let listing = self
            .object_store
            .list_with_delimiter(Some(&self.root))
            .await
            .map_err(|e| self.list_error(e))?;

        let ids = listing
            .common_prefixes
            .into_iter()
            .map(|prefix| format!("{prefix}/"))
            .collect::<BTreeSet<_>>();

        tracing::debug!(
            prefixes = ids.len(),
            stray_objects = listing.objects.len(),
            "Listed snapshot prefixes"
        );

        Ok(ids)
    }

    async fn delete_backup(&self, id: &str) -> Result<usize, StoreError> {
        let prefix = Self::snapshot_path(id).map_err(|source| StoreError::Delete {
            id: id.to_string(),
            source,
        })?;
        let locations = self
            .object_store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location)
            .boxed();

        let mut deleted = self.object_store.delete_stream(locations);
        let mut count = 0;

        while let Some(result) = deleted.next().await {
            match result {
                Ok(path) => {
                    tracing::trace!(path = %path, "Deleted snapshot object");
                    count += 1;
                }
                // Removed concurrently by another run
                Err(object_store::Error::NotFound { path, .. }) => {
                    tracing::debug!(path = %path, "Snapshot object already gone");
                }
                Err(source) => {
                    return Err(StoreError::Delete {
                        id: id.to_string(),
                        source,
                    });
                }
            }
        }

        Ok(count)
    }

    async fn object_count(&self, id: &str) -> Result<Option<usize>, StoreError> {
        let prefix = Self::snapshot_path(id).map_err(|source| StoreError::List {
            prefix: id.to_string(),
            source,
        })?;
        let objects = self
            .object_store
            .list(Some(&prefix))
            .try_fold(0usize, |count, _| async move { Ok(count + 1) })
            .await
            .map_err(|source| StoreError::List {
                prefix: id.to_string(),
                source,
            })?;

        Ok(Some(objects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::PutPayload;
    use object_store::memory::InMemory;

    async fn put(store: &InMemory, key: &str) {
        store
            .put(&ObjectPath::from(key), PutPayload::from_static(b"data"))
            .await
            .unwrap();
    }

    async fn seeded() -> (Arc<InMemory>, ObjectStoreSnapshotStore) {
        let memory = Arc::new(InMemory::new());
        put(&memory, "snapshots/2026-02-27-10-00/home.tar.zst").await;
        put(&memory, "snapshots/2026-02-27-10-00/manifest.json").await;
        put(&memory, "snapshots/2026-02-27-11-00/home.tar.zst").await;
        put(&memory, "snapshots/2026-02-27-11-00/nested/part-0").await;
        put(&memory, "snapshots/2026-02-27-11-005/stray").await;
        put(&memory, "latest/home.tar.zst").await;
        let store = ObjectStoreSnapshotStore::new(memory.clone());
        (memory, store)
    }

    async fn keys(memory: &InMemory) -> Vec<String> {
        memory
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect::<Vec<_>>()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_returns_top_level_prefixes() {
        let (_, store) = seeded().await;
        let ids = store.list_backup_ids().await.unwrap();
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec![
                "snapshots/2026-02-27-10-00/".to_string(),
                "snapshots/2026-02-27-11-00/".to_string(),
                "snapshots/2026-02-27-11-005/".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let store = ObjectStoreSnapshotStore::new(Arc::new(InMemory::new()));
        assert!(store.list_backup_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_only_target_prefix() {
        let (memory, store) = seeded().await;

        let removed = store
            .delete_backup("snapshots/2026-02-27-11-00/")
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let mut remaining = keys(&memory).await;
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "latest/home.tar.zst".to_string(),
                "snapshots/2026-02-27-10-00/home.tar.zst".to_string(),
                "snapshots/2026-02-27-10-00/manifest.json".to_string(),
                "snapshots/2026-02-27-11-005/stray".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_missing_prefix_is_noop() {
        let (_, store) = seeded().await;
        let first = store
            .delete_backup("snapshots/2026-02-27-10-00/")
            .await
            .unwrap();
        let second = store
            .delete_backup("snapshots/2026-02-27-10-00/")
            .await
            .unwrap();
        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert_eq!(
            store
                .delete_backup("snapshots/1999-01-01-00-00/")
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_delete_percent_encoded_prefix() {
        let memory = Arc::new(InMemory::new());
        put(&memory, "snapshots/50%off/part").await;
        put(&memory, "snapshots/2026-02-27-10-00/home.tar.zst").await;
        let store = ObjectStoreSnapshotStore::new(memory.clone());

        let ids = store.list_backup_ids().await.unwrap();
        assert!(ids.contains("snapshots/50%25off/"));

        assert_eq!(
            store.object_count("snapshots/50%25off/").await.unwrap(),
            Some(1)
        );
        let removed = store.delete_backup("snapshots/50%25off/").await.unwrap();
        assert_eq!(removed, 1);

        let ids = store.list_backup_ids().await.unwrap();
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["snapshots/2026-02-27-10-00/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_unparseable_id_is_an_error() {
        let (_, store) = seeded().await;
        let result = store.delete_backup("snapshots//2026-02-27-10-00/").await;
        assert!(matches!(result, Err(StoreError::Delete { .. })));
    }

    #[tokio::test]
    async fn test_object_count() {
        let (_, store) = seeded().await;
        assert_eq!(
            store
                .object_count("snapshots/2026-02-27-10-00/")
                .await
                .unwrap(),
            Some(2)
        );
        assert_eq!(
            store
                .object_count("snapshots/2030-01-01-00-00/")
                .await
                .unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn test_local_filesystem_backend() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(
            object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap(),
        );
        local
            .put(
                &ObjectPath::from("snapshots/2026-02-27-10-00/home.tar.zst"),
                PutPayload::from_static(b"data"),
            )
            .await
            .unwrap();

        let store = ObjectStoreSnapshotStore::new(local);
        let ids = store.list_backup_ids().await.unwrap();
        assert!(ids.contains("snapshots/2026-02-27-10-00/"));

        let removed = store
            .delete_backup("snapshots/2026-02-27-10-00/")
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
