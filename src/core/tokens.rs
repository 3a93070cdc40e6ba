use crate::core::error::SyncError;
use crate::core::models::Credential;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Holder of the current credential, written through to a JSON file.
pub struct TokenStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Credential>>,
}

impl TokenStore {
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("order-sheet").join("tokens.json"))
    }

    pub fn open(path: PathBuf) -> Result<Self, SyncError> {
        let current = match read_token_file(&path) {
            Ok(credential) => credential,
            Err(e @ SyncError::CorruptTokenFile { .. }) => {
                tracing::warn!(error = %e, "Ignoring unreadable token file");
                None
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(?path, loaded = current.is_some(), "Opened token store");

        Ok(Self {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn get(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    /// Replaces the credential and writes all three fields in one file
    /// replacement. The in-memory value is updated even when the write
    /// fails: the upstream has already rotated the refresh token, so the new
    /// one is the only usable copy.
    pub async fn set(&self, credential: Credential) -> Result<(), SyncError> {
        let mut current = self.current.write().await;
        let result = match &self.path {
            Some(path) => persist(path.clone(), credential.clone()).await,
            None => Ok(()),
        };
        *current = Some(credential);

        if result.is_ok() {
            tracing::debug!(path = ?self.path, "Saved credential");
        }
        result
    }

    /// Re-reads the token file. Returns true when the in-memory credential
    /// changed as a result.
    pub async fn reload(&self) -> Result<bool, SyncError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };

        let on_disk = load(path.clone()).await?;
        let mut current = self.current.write().await;

        if on_disk.is_none() || *current == on_disk {
            return Ok(false);
        }

        *current = on_disk;
        Ok(true)
    }
}

async fn persist(path: PathBuf, credential: Credential) -> Result<(), SyncError> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || write_token_file(&path, &credential))
        .await
        .map_err(|e| SyncError::storage(target, std::io::Error::other(e)))?
}

async fn load(path: PathBuf) -> Result<Option<Credential>, SyncError> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || read_token_file(&path))
        .await
        .map_err(|e| SyncError::storage(target, std::io::Error::other(e)))?
}

fn read_token_file(path: &Path) -> Result<Option<Credential>, SyncError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| SyncError::storage(path, e))?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| SyncError::CorruptTokenFile {
            path: path.to_path_buf(),
            source,
        })
}

fn write_token_file(path: &Path, credential: &Credential) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SyncError::storage(parent, e))?;
    }

    let content = serde_json::to_string_pretty(credential)
        .map_err(|e| SyncError::storage(path, std::io::Error::other(e)))?;

    // readers see either the old file or the new one, never a partial write
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(|e| SyncError::storage(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| SyncError::storage(path, e))?;

    Ok(())
}
