//! Signaling key persistence.
//!
//! The client's private insert URI is the only state that has to survive a
//! restart: without it the bridge would have to be re-signaled with a new key.
//! Writes are atomic (`.tmp` then rename) and the file is readable by the
//! owner only.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::{StorageSection, parse_path};

/// File name for the insert-form signaling URI.
const SIGNAL_KEY_FILE: &str = "signal_ssk";

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored signaling key is corrupt: {0}")]
    Corrupt(String),

    #[error("failed to determine storage directory: {0}")]
    Directory(String),
}

/// Persistent storage for client state.
#[derive(Debug)]
pub struct Storage {
    base_dir: PathBuf,
}

impl Storage {
    /// Create a new storage instance, creating the directory if needed.
    ///
    /// # Note
    /// This performs blocking I/O (`create_dir_all`). Call at startup.
    pub fn new(base_dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Create storage at the default path (`~/.ceno/storage`).
    pub fn default_path() -> Result<Self, StorageError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StorageError::Directory("could not determine home directory".into()))?;
        Self::new(home.join(".ceno").join("storage"))
    }

    /// Open storage as configured. `Ok(None)` when storage is disabled.
    pub fn from_config(section: &StorageSection) -> Result<Option<Self>, StorageError> {
        if !section.enable {
            return Ok(None);
        }
        let storage = match &section.path {
            Some(path) => Self::new(parse_path(path))?,
            None => Self::default_path()?,
        };
        Ok(Some(storage))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Save the insert-form signaling URI.
    pub async fn save_signal_key(&self, insert_uri: &str) -> Result<(), StorageError> {
        let mut content = insert_uri.trim().to_string();
        content.push('\n');
        self.atomic_write(&self.base_dir.join(SIGNAL_KEY_FILE), content.as_bytes())
            .await
    }

    /// Load the signaling URI. Returns `Ok(None)` if none was saved.
    ///
    /// The content is returned as stored; whether it is a usable key is for
    /// the channel maker to decide.
    pub async fn load_signal_key(&self) -> Result<Option<String>, StorageError> {
        let path = self.base_dir.join(SIGNAL_KEY_FILE);
        match fs::read(&path).await {
            Ok(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|_| StorageError::Corrupt("not valid UTF-8".into()))?;
                let key = text.trim();
                if key.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(key.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Write data atomically: write to a `.tmp` file, restrict it, then rename.
    async fn atomic_write(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}
