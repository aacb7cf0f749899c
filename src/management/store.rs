use std::{collections::HashMap, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// The two logical slots the session needs to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Long-lived refresh token, survives process restarts.
    RefreshToken,
    /// Single-use state of an in-flight authorization.
    PendingAuthState,
}

impl StoreKey {
    fn file_name(&self) -> &'static str {
        match self {
            StoreKey::RefreshToken => "refresh_token",
            StoreKey::PendingAuthState => "auth_state.json",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable get/set/delete over string values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;
    /// Writes to a sibling temp file created owner-only, then renames it over
    /// the target so readers never see a partial value.
    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let temp = path.with_extension("tmp");
        match async_fs::remove_file(&temp).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e)),
        }

        let mut options = async_fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use async_fs::unix::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&temp).await?;
        drop(file);

        // The file already exists, so this keeps its mode.
        async_fs::write(&temp, value).await?;
        if let Err(e) = async_fs::rename(&temp, &path).await {
            let _ = async_fs::remove_file(&temp).await;
            return Err(StoreError::Io(e));
        }

        Ok(())
    }

    async fn delete(&self, key: StoreKey) -> Result<(), StoreError>;
}

/// One file per key below a state directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        match async_fs::read_to_string(self.path(key)).await {
            Ok(content) => {
                let content = content.trim();
                Ok((!content.is_empty()).then(|| content.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        async_fs::write(&path, value).await?;

        #[cfg(unix)]
        {
            use std::{fs::Permissions, os::unix::fs::PermissionsExt};
            async_fs::set_permissions(&path, Permissions::from_mode(0o600)).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: StoreKey) -> Result<(), StoreError> {
        match async_fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Process-local store, nothing survives exit.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.values.lock().await.insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: StoreKey) -> Result<(), StoreError> {
        self.values.lock().await.remove(&key);
        Ok(())
    }
}
