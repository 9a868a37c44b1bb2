//! Durable credential storage.
//!
//! The persisted credential is two string entries, `token` and `user` (the
//! identity serialized as JSON). Both are always written together so a
//! reader never observes a token paired with someone else's identity.
//!
//! Two implementations are provided:
//! - [`FileCredentialStore`] - a JSON file replaced atomically via rename
//! - [`MemoryCredentialStore`] - process-local, for tests and ephemeral sessions

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::api::types::Identity;

/// Errors raised by a credential store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("credential storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored entries could not be decoded.
    #[error("credential storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Token and identity, persisted as one unit.
#[derive(Clone)]
pub struct PersistedCredential {
    pub token: SecretString,
    pub identity: Identity,
}

impl PersistedCredential {
    /// Pair a token with the identity it authenticates.
    #[must_use]
    pub fn new(token: impl Into<String>, identity: Identity) -> Self {
        Self {
            token: SecretString::from(token.into()),
            identity,
        }
    }
}

impl std::fmt::Debug for PersistedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedCredential")
            .field("token", &"[REDACTED]")
            .field("identity", &self.identity.username)
            .finish()
    }
}

/// Durable storage for the session credential.
pub trait CredentialStore: Send + Sync {
    /// Read only the token. Present even when the identity entry is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn read_token(&self) -> Result<Option<SecretString>, StorageError>;

    /// Read the full credential. `None` unless both entries are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or the identity entry
    /// does not decode.
    fn load(&self) -> Result<Option<PersistedCredential>, StorageError>;

    /// Replace both entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn save(&self, credential: &PersistedCredential) -> Result<(), StorageError>;

    /// Remove both entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// The raw on-disk layout: two optional string entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl StoredEntries {
    fn from_credential(credential: &PersistedCredential) -> Result<Self, StorageError> {
        Ok(Self {
            token: Some(credential.token.expose_secret().to_string()),
            user: Some(serde_json::to_string(&credential.identity)?),
        })
    }

    fn token(&self) -> Option<SecretString> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::from(t.to_string()))
    }

    fn credential(&self) -> Result<Option<PersistedCredential>, StorageError> {
        let (Some(token), Some(user)) = (self.token(), self.user.as_deref()) else {
            return Ok(None);
        };
        let identity: Identity = serde_json::from_str(user)?;
        Ok(Some(PersistedCredential { token, identity }))
    }
}

// =============================================================================
// FileCredentialStore
// =============================================================================

/// Credential store backed by a JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so the file always holds either the old or the new tuple.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store at `path`. Nothing is touched until the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<StoredEntries, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(StoredEntries::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StoredEntries::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &StoredEntries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn read_token(&self) -> Result<Option<SecretString>, StorageError> {
        Ok(self.read_entries()?.token())
    }

    fn load(&self) -> Result<Option<PersistedCredential>, StorageError> {
        self.read_entries()?.credential()
    }

    #[instrument(skip(self, credential), fields(path = %self.path.display()))]
    fn save(&self, credential: &PersistedCredential) -> Result<(), StorageError> {
        self.write_entries(&StoredEntries::from_credential(credential)?)?;
        debug!(user = %credential.identity.username, "Credential persisted");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Credential cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MemoryCredentialStore
// =============================================================================

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<StoredEntries>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with raw entries, including partial ones.
    #[must_use]
    pub fn with_entries(entries: StoredEntries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Snapshot of the raw entries.
    #[must_use]
    pub fn entries(&self) -> StoredEntries {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read_token(&self) -> Result<Option<SecretString>, StorageError> {
        Ok(self.entries().token())
    }

    fn load(&self) -> Result<Option<PersistedCredential>, StorageError> {
        self.entries().credential()
    }

    fn save(&self, credential: &PersistedCredential) -> Result<(), StorageError> {
        let entries = StoredEntries::from_credential(credential)?;
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = StoredEntries::default();
        Ok(())
    }
}
