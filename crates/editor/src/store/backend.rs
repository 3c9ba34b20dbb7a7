//! Key-value backends for the editor store.
//!
//! A backend holds named stores, each a map from string keys to JSON values.
//! Writes are last-write-wins; there are no transactions.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::RwLock;

use super::StoreError;

/// Storage primitive underneath [`super::ProjectStore`].
pub trait KvBackend: Send + Sync {
    /// Read one value.
    fn get(
        &self,
        store: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Insert or replace one value.
    fn put(
        &self,
        store: &str,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove one value. Returns whether it existed.
    fn delete(&self, store: &str, key: &str)
    -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All entries of a store, ordered by key.
    fn list(&self, store: &str)
    -> impl Future<Output = Result<Vec<(String, Value)>, StoreError>> + Send;

    /// Remove every entry of a store.
    fn clear(&self, store: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

type StoreMap = BTreeMap<String, Value>;

/// In-process backend. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stores: RwLock<HashMap<String, StoreMap>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    async fn get(&self, store: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let stores = self.stores.read().await;
        Ok(stores.get(store).and_then(|s| s.get(key)).cloned())
    }

    async fn put(&self, store: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut stores = self.stores.write().await;
        stores
            .entry(store.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str) -> Result<bool, StoreError> {
        let mut stores = self.stores.write().await;
        Ok(stores
            .get_mut(store)
            .is_some_and(|s| s.remove(key).is_some()))
    }

    async fn list(&self, store: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let stores = self.stores.read().await;
        Ok(stores
            .get(store)
            .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn clear(&self, store: &str) -> Result<(), StoreError> {
        self.stores.write().await.remove(store);
        Ok(())
    }
}

/// Directory-backed backend: `<root>/<database>/<store>.json`.
///
/// Each store file is a single JSON object. Writes go to a temporary file
/// that is renamed over the original, so a crash never leaves a half-written
/// store behind. One lock per backend serializes read-modify-write cycles.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl FileBackend {
    /// Open (and create if needed) the directory for `database` under `root`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn open(root: impl AsRef<Path>, database: &str) -> Result<Self, StoreError> {
        let dir = root.as_ref().join(database);
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(path = %dir.display(), "Opened editor store directory");
        Ok(Self {
            dir,
            lock: RwLock::new(()),
        })
    }

    /// Directory holding the store files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn store_path(&self, store: &str) -> Result<PathBuf, StoreError> {
        let valid = !store.is_empty()
            && store
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidStoreName(store.to_owned()));
        }
        Ok(self.dir.join(format!("{store}.json")))
    }

    async fn read_store(&self, store: &str) -> Result<StoreMap, StoreError> {
        let path = self.store_path(store)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::DataCorruption {
                store: store.to_owned(),
                key: None,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_store(&self, store: &str, map: &StoreMap) -> Result<(), StoreError> {
        let path = self.store_path(store)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(map)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

impl KvBackend for FileBackend {
    async fn get(&self, store: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.read().await;
        let mut map = self.read_store(store).await?;
        Ok(map.remove(key))
    }

    async fn put(&self, store: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let mut map = self.read_store(store).await?;
        map.insert(key.to_owned(), value);
        self.write_store(store, &map).await
    }

    async fn delete(&self, store: &str, key: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.write().await;
        let mut map = self.read_store(store).await?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.write_store(store, &map).await?;
        Ok(true)
    }

    async fn list(&self, store: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.read_store(store).await?.into_iter().collect())
    }

    async fn clear(&self, store: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let path = self.store_path(store)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn exercise<B: KvBackend>(backend: &B) {
        assert_eq!(backend.get("projects", "a").await.unwrap(), None);

        backend.put("projects", "b", json!({"n": 2})).await.unwrap();
        backend.put("projects", "a", json!({"n": 1})).await.unwrap();
        backend.put("projects", "a", json!({"n": 3})).await.unwrap();

        assert_eq!(
            backend.get("projects", "a").await.unwrap(),
            Some(json!({"n": 3}))
        );
        let keys: Vec<String> = backend
            .list("projects")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);

        assert!(backend.delete("projects", "a").await.unwrap());
        assert!(!backend.delete("projects", "a").await.unwrap());
        assert!(backend.list("unsavedSigns").await.unwrap().is_empty());

        backend.clear("projects").await.unwrap();
        assert!(backend.list("projects").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_backend() {
        exercise(&MemoryBackend::new()).await;
    }

    #[tokio::test]
    async fn test_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path(), "card-editor").await.unwrap();
        exercise(&backend).await;
    }

    #[tokio::test]
    async fn test_file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = FileBackend::open(dir.path(), "card-editor").await.unwrap();
            backend
                .put("unsavedSigns", "x", json!({"width": 100}))
                .await
                .unwrap();
        }
        let backend = FileBackend::open(dir.path(), "card-editor").await.unwrap();
        assert_eq!(
            backend.get("unsavedSigns", "x").await.unwrap(),
            Some(json!({"width": 100}))
        );
        assert!(dir.path().join("card-editor/unsavedSigns.json").exists());
        assert!(!dir.path().join("card-editor/unsavedSigns.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_backend_rejects_path_like_store_names() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path(), "card-editor").await.unwrap();
        assert!(matches!(
            backend.get("../escape", "k").await,
            Err(StoreError::InvalidStoreName(_))
        ));
    }

    #[tokio::test]
    async fn test_file_backend_reports_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path(), "card-editor").await.unwrap();
        tokio::fs::write(backend.dir().join("projects.json"), b"{not json")
            .await
            .unwrap();
        assert!(matches!(
            backend.list("projects").await,
            Err(StoreError::DataCorruption { .. })
        ));
    }
}
