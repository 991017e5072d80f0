use crate::application::ports::IdentityStore;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    pubkey: String,
}

/// Stores the logged-in pubkey as a small JSON file in the data directory.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join("identity.json"),
        }
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self) -> Result<Option<String>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let stored: StoredIdentity = serde_json::from_str(&raw)?;
        if stored.pubkey.is_empty() {
            return Ok(None);
        }
        Ok(Some(stored.pubkey))
    }

    async fn save(&self, pubkey: &str) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string(&StoredIdentity {
            pubkey: pubkey.to_string(),
        })?;
        tokio::fs::write(&self.path, raw).await?;
        debug!(path = %self.path.display(), "identity saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
