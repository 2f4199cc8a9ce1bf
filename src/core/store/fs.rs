//! Filesystem-based secret store.
//!
//! One JSON document per secret under the store directory. Every mutation is
//! read-modify-write: load the record, apply the change, write to a
//! temporary file and rename over the original. A revision counter inside
//! the document is re-checked under the store lock before the rename, so a
//! losing concurrent writer gets `StoreError::Conflict` instead of silently
//! overwriting.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

use super::{record_ops, SecretStore};
use crate::core::stage::Stage;
use crate::core::types::{SecretId, VersionId};
use crate::core::version::{SecretRecord, SecretVersion};
use crate::error::{Result, StoreError};

/// How long to wait on another process's lock file before giving up.
const LOCK_RETRIES: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Filesystem-backed secret store.
///
/// Defaults to `~/.keyturn/store` when no directory is given.
pub struct FilesystemStore {
    dir: PathBuf,
    // Serializes writers within this process; the lock file serializes
    // across processes.
    write_guard: Mutex<()>,
}

impl FilesystemStore {
    /// Open (and create if needed) a store at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(StoreError::WriteFailed)?;
        Ok(Self {
            dir,
            write_guard: Mutex::new(()),
        })
    }

    /// Default store location (`~/.keyturn/store`).
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".keyturn")
            .join("store")
    }

    fn record_path(&self, secret_id: &SecretId) -> Result<PathBuf> {
        // Secret ids become filenames; refuse anything that could escape
        // the store directory.
        let id = secret_id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !safe || id.starts_with('.') {
            return Err(StoreError::NotFound(format!("invalid secret id: {id}")).into());
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn load(&self, secret_id: &SecretId) -> Result<SecretRecord> {
        let path = self.record_path(secret_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(secret_id.to_string()).into());
        }
        let contents = fs::read_to_string(&path).map_err(StoreError::ReadFailed)?;
        let record = serde_json::from_str(&contents).map_err(StoreError::Corrupt)?;
        Ok(record)
    }

    fn load_or_new(&self, secret_id: &SecretId) -> Result<SecretRecord> {
        match self.load(secret_id) {
            Ok(record) => Ok(record),
            Err(crate::error::Error::Store(StoreError::NotFound(_))) => {
                Ok(SecretRecord::new(secret_id.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Write `record` atomically, failing with `Conflict` if the on-disk
    /// revision no longer matches `expected_revision`.
    fn commit(&self, record: &mut SecretRecord, expected_revision: u64) -> Result<()> {
        let _guard = self.write_guard.lock().unwrap_or_else(|e| e.into_inner());
        let _lock = LockFile::acquire(&self.dir)?;

        // Re-check under the lock: another writer may have committed since
        // our read.
        let path = self.record_path(&record.secret_id)?;
        if path.exists() {
            let contents = fs::read_to_string(&path).map_err(StoreError::ReadFailed)?;
            let on_disk: SecretRecord =
                serde_json::from_str(&contents).map_err(StoreError::Corrupt)?;
            if on_disk.revision != expected_revision {
                return Err(StoreError::Conflict(record.secret_id.to_string()).into());
            }
        } else if expected_revision != 0 {
            return Err(StoreError::Conflict(record.secret_id.to_string()).into());
        }

        record.revision = expected_revision + 1;
        let contents = serde_json::to_string_pretty(record).map_err(StoreError::Corrupt)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(StoreError::WriteFailed)?;

        // Secret material lives in these files; restrict to the owner.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
                .map_err(StoreError::WriteFailed)?;
        }

        fs::rename(&tmp, &path).map_err(StoreError::WriteFailed)?;
        debug!(
            secret = %record.secret_id,
            revision = record.revision,
            "record committed"
        );
        Ok(())
    }

    fn mutate<T>(
        &self,
        secret_id: &SecretId,
        f: impl FnOnce(&mut SecretRecord) -> Result<T>,
    ) -> Result<T> {
        let mut record = self.load_or_new(secret_id)?;
        let expected = record.revision;
        let out = f(&mut record)?;
        self.commit(&mut record, expected)?;
        Ok(out)
    }
}

impl SecretStore for FilesystemStore {
    fn get(&self, secret_id: &SecretId, stage: Stage) -> Result<SecretVersion> {
        let record = self.load(secret_id)?;
        record_ops::get(&record, secret_id, stage)
    }

    fn put(&self, secret_id: &SecretId, version: SecretVersion) -> Result<VersionId> {
        self.mutate(secret_id, |record| record_ops::put(record, version))
    }

    fn promote_and_demote(
        &self,
        secret_id: &SecretId,
        pending_version_id: &VersionId,
    ) -> Result<()> {
        self.mutate(secret_id, |record| {
            record_ops::promote_and_demote(record, pending_version_id)
        })
    }

    fn list_by_stage(&self, secret_id: &SecretId, stage: Stage) -> Result<Vec<SecretVersion>> {
        let record = self.load(secret_id)?;
        Ok(record
            .versions
            .iter()
            .filter(|v| v.stage == stage)
            .cloned()
            .collect())
    }

    fn retire(&self, secret_id: &SecretId, version_id: &VersionId) -> Result<()> {
        self.mutate(secret_id, |record| record_ops::retire(record, version_id))
    }

    fn list_secrets(&self) -> Result<Vec<SecretId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(StoreError::ReadFailed)? {
            let entry = entry.map_err(StoreError::ReadFailed)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix(".json") {
                ids.push(SecretId::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Cross-process advisory lock: a file created with `create_new`, removed on
/// drop. Writers spin briefly if another process holds it.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(".lock");
        for _ in 0..LOCK_RETRIES {
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    std::thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(e) => return Err(StoreError::WriteFailed(e).into()),
            }
        }
        Err(StoreError::WriteFailed(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("store lock held too long: {}", path.display()),
        ))
        .into())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
