//! Durable credential storage.
//!
//! Credentials persist in two named slots, `access_token` and
//! `refresh_token`. The in-memory [`CredentialStore`](super::CredentialStore)
//! is authoritative; storage is written through on every change and read
//! once at startup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::Result;
use crate::error::StorageError;

use super::tokens::{AccessToken, CredentialPair, RenewalToken};

/// Slot holding the access credential.
pub const ACCESS_SLOT: &str = "access_token";

/// Slot holding the renewal credential.
pub const RENEWAL_SLOT: &str = "refresh_token";

/// Durable key-value persistence for the credential pair.
#[async_trait]
pub trait TokenStorage: Send + Sync + std::fmt::Debug {
    /// Read the stored pair. An empty access slot means no session.
    async fn load(&self) -> Result<Option<CredentialPair>>;

    /// Overwrite both slots.
    async fn save(&self, pair: &CredentialPair) -> Result<()>;

    /// Erase both slots.
    async fn erase(&self) -> Result<()>;
}

/// Process-local storage that forgets everything on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<Option<CredentialPair>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with a pair, as if saved by a previous run.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            slots: Mutex::new(Some(pair)),
        }
    }
}

#[async_trait]
impl TokenStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<CredentialPair>> {
        Ok(self.slots.lock().await.clone())
    }

    async fn save(&self, pair: &CredentialPair) -> Result<()> {
        *self.slots.lock().await = Some(pair.clone());
        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        *self.slots.lock().await = None;
        Ok(())
    }
}

/// On-disk document layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

/// JSON file storage with owner-only permissions.
///
/// Writes go to a sibling temp file that is renamed into place, so a crash
/// mid-write leaves the previous pair intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn format_error(&self, err: serde_json::Error) -> StorageError {
        StorageError::Format {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Returns when the slots were last written, if ever.
    pub async fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read_slots().await?.and_then(|slots| slots.saved_at))
    }

    async fn read_slots(&self) -> Result<Option<StoredSlots>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e).into()),
        };

        let slots: StoredSlots = serde_json::from_str(&json).map_err(|e| self.format_error(e))?;
        Ok(Some(slots))
    }
}

#[async_trait]
impl TokenStorage for FileStorage {
    async fn load(&self) -> Result<Option<CredentialPair>> {
        let Some(slots) = self.read_slots().await? else {
            return Ok(None);
        };

        Ok(slots.access_token.map(|access| CredentialPair {
            access_token: AccessToken::new(access),
            renewal_token: slots.refresh_token.map(RenewalToken::new),
        }))
    }

    async fn save(&self, pair: &CredentialPair) -> Result<()> {
        let slots = StoredSlots {
            access_token: Some(pair.access_token.as_str().to_string()),
            refresh_token: pair
                .renewal_token
                .as_ref()
                .map(|t| t.as_str().to_string()),
            saved_at: Some(Utc::now()),
        };
        let json = serde_json::to_string_pretty(&slots).map_err(|e| self.format_error(e))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;

        // Restrict before the rename so the secret is never world-readable.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credentials erased");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e).into()),
        }
    }
}
