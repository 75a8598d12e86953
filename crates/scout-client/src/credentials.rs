use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scout_core::error::ScoutError;
use scout_core::traits::{CredentialStore, StoreNamespace};
use tokio::sync::Mutex;

/// Credential store backed by one JSON object file per namespace.
///
/// `<dir>/sync.json` and `<dir>/local.json` each hold a flat
/// `{"key": "value"}` map. Writes go to a temporary file that is then
/// renamed over the original.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

type Entries = BTreeMap<String, String>;

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, namespace: StoreNamespace) -> PathBuf {
        self.dir.join(format!("{}.json", namespace.as_str()))
    }

    async fn load(&self, namespace: StoreNamespace) -> Result<Entries, ScoutError> {
        let path = self.path(namespace);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Ok(Entries::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                ScoutError::StorageError(format!("Corrupt store {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(ScoutError::StorageError(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn save(&self, namespace: StoreNamespace, entries: &Entries) -> Result<(), ScoutError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ScoutError::StorageError(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.path(namespace);
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(entries)?;

        tokio::fs::write(&tmp, text).await.map_err(|e| {
            ScoutError::StorageError(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            ScoutError::StorageError(format!("Failed to replace {}: {e}", path.display()))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    async fn get(
        &self,
        namespace: StoreNamespace,
        key: &str,
    ) -> Result<Option<String>, ScoutError> {
        Ok(self.load(namespace).await?.remove(key))
    }

    async fn set(
        &self,
        namespace: StoreNamespace,
        key: &str,
        value: &str,
    ) -> Result<(), ScoutError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(namespace).await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(namespace, &entries).await
    }

    async fn remove(&self, namespace: StoreNamespace, key: &str) -> Result<(), ScoutError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(namespace).await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(namespace, &entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::credential::{
        CREDENTIAL_KEY, clear_credential, resolve_credential, save_credential,
    };

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested"));

        assert_eq!(store.get(StoreNamespace::Sync, "k").await.unwrap(), None);
        assert_eq!(resolve_credential(&store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_writes_both_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());

        save_credential(&store, "  gc_live_123 ").await.unwrap();

        for namespace in StoreNamespace::READ_ORDER {
            let stored = store.get(namespace, CREDENTIAL_KEY).await.unwrap();
            assert_eq!(stored.as_deref(), Some("gc_live_123"));
        }
        let raw = std::fs::read_to_string(dir.path().join("sync.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[CREDENTIAL_KEY], "gc_live_123");
        assert!(!dir.path().join("sync.json.tmp").exists());
    }

    #[tokio::test]
    async fn local_is_used_when_sync_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        store
            .set(StoreNamespace::Local, CREDENTIAL_KEY, "local-only")
            .await
            .unwrap();

        assert_eq!(
            resolve_credential(&store).await.unwrap().as_deref(),
            Some("local-only")
        );
    }

    #[tokio::test]
    async fn corrupt_sync_file_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sync.json"), "{not json").unwrap();
        let store = FileCredentialStore::new(dir.path());
        store
            .set(StoreNamespace::Local, CREDENTIAL_KEY, "k")
            .await
            .unwrap();

        assert!(matches!(
            store.get(StoreNamespace::Sync, CREDENTIAL_KEY).await,
            Err(ScoutError::StorageError(_))
        ));
        assert_eq!(
            resolve_credential(&store).await.unwrap().as_deref(),
            Some("k")
        );
    }

    #[tokio::test]
    async fn clear_removes_key_but_keeps_other_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        save_credential(&store, "k").await.unwrap();
        store
            .set(StoreNamespace::Sync, "theme", "dark")
            .await
            .unwrap();

        clear_credential(&store).await.unwrap();

        assert_eq!(resolve_credential(&store).await.unwrap(), None);
        let theme = store.get(StoreNamespace::Sync, "theme").await.unwrap();
        assert_eq!(theme.as_deref(), Some("dark"));
    }
}
