//! Token file persistence.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use authwire_core::error::StorageError;
use authwire_core::{Result, TokenPair, TokenPersistence};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// On-disk layout. Both entries are optional on read so that a file missing
/// one of them can be recognised and ignored.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
}

/// Token persistence backed by a single JSON file.
///
/// Every save writes a fresh temporary file next to the target and renames
/// it into place, so readers see the old pair or the new pair and never a
/// mix. Writers in different processes are serialised by an exclusive lock
/// on a sibling `.lock` file.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Persist tokens at `path`. Parent directories are created on first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tokens.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
    }

    fn io_error(&self, err: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Take the cross-process write lock. Released when the file is dropped.
    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| self.io_error(e))?;

        lock_file.lock_exclusive().map_err(|e| self.io_error(e))?;
        Ok(lock_file)
    }

    fn write_temp(&self, temp_path: &Path, contents: &str) -> std::io::Result<()> {
        let mut file = File::create(temp_path)?;

        #[cfg(unix)]
        {
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(temp_path, perms)?;
        }

        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

impl TokenPersistence for FilePersistence {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<TokenPair>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e).into()),
        };

        let stored: StoredTokens =
            serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        match (stored.access_token, stored.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                debug!("Loaded stored token pair");
                Ok(Some(TokenPair::new(access, refresh)))
            }
            (None, None) => Ok(None),
            _ => {
                warn!("Token file holds an incomplete pair, ignoring it");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, pair), fields(path = %self.path.display()))]
    fn save(&self, pair: &TokenPair) -> Result<()> {
        let stored = StoredTokens {
            access_token: Some(pair.access_token.as_str().to_string()),
            refresh_token: Some(pair.refresh_token.as_str().to_string()),
            saved_at: Some(Utc::now().to_rfc3339()),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let lock_file = self.lock()?;

        let temp_path = self.temp_path();
        if let Err(e) = self.write_temp(&temp_path, &json) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(e).into());
        }
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(e).into());
        }

        drop(lock_file);
        debug!("Saved token pair");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) -> Result<()> {
        let lock_file = self.lock()?;

        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed token file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.io_error(e).into()),
        }

        drop(lock_file);
        Ok(())
    }
}
