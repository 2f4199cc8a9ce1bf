//! Versioned secret storage.
//!
//! Durable key-value storage of secret versions with atomic stage
//! reassignment. The store knows nothing about the rotation protocol; it
//! only enforces the structural invariants (single pending slot, atomic
//! promotion) that the protocol relies on.
//!
//! ## Adding a New Backend
//!
//! 1. Implement the `SecretStore` trait
//! 2. Add the implementation in a new file (e.g., `sql.rs`, `vault.rs`)
//! 3. Re-export from this module
//!
//! Every mutation must be atomic from the caller's perspective and must fail
//! with `StoreError::Conflict` when it loses a race, so that callers retry
//! the whole read-then-decide sequence instead of overwriting.

use crate::core::stage::Stage;
use crate::core::types::{SecretId, VersionId};
use crate::core::version::SecretVersion;
use crate::error::Result;

mod fs;
mod memory;

pub use fs::FilesystemStore;
pub use memory::MemoryStore;

/// Durable versioned secret storage.
pub trait SecretStore: Send + Sync {
    /// Fetch the version currently in `stage`.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the secret does not exist,
    /// `StoreError::NoVersionInStage` if no version holds the stage.
    fn get(&self, secret_id: &SecretId, stage: Stage) -> Result<SecretVersion>;

    /// Store a version in the pending slot.
    ///
    /// Idempotent per rotation token: if the pending slot is already held by
    /// a version with the same token, that version is replaced (this is how
    /// phase progress marks are persisted) and its id returned. A pending
    /// version held by a *different* token fails with
    /// `StoreError::AlreadyPending`.
    fn put(&self, secret_id: &SecretId, version: SecretVersion) -> Result<VersionId>;

    /// Atomically promote the pending version to `Current` and demote the
    /// prior `Current` (if any) to `Previous`.
    ///
    /// There is never an intermediate state visible with zero or two
    /// current versions.
    ///
    /// # Errors
    ///
    /// `StoreError::Conflict` if `pending_version_id` no longer holds the
    /// pending slot (a concurrent caller finished first).
    fn promote_and_demote(&self, secret_id: &SecretId, pending_version_id: &VersionId)
        -> Result<()>;

    /// All versions of a secret currently in `stage`.
    fn list_by_stage(&self, secret_id: &SecretId, stage: Stage) -> Result<Vec<SecretVersion>>;

    /// Move a `Previous` version to `Deprecated` after its credential has
    /// been revoked on the target. Never applies to `Current` or `Pending`.
    fn retire(&self, secret_id: &SecretId, version_id: &VersionId) -> Result<()>;

    /// All secret ids known to the store.
    fn list_secrets(&self) -> Result<Vec<SecretId>>;
}

pub(crate) mod record_ops {
    //! Record-level mutation logic shared by backends.
    //!
    //! Each backend supplies atomicity (mutex or lock-check-rename); the
    //! stage bookkeeping itself is identical and lives here.

    use chrono::Utc;

    use crate::core::stage::Stage;
    use crate::core::types::{SecretId, VersionId};
    use crate::core::version::{SecretRecord, SecretVersion};
    use crate::error::{Result, StoreError};

    /// Apply a `put` to a loaded record. Returns the id now holding the
    /// pending slot.
    pub fn put(record: &mut SecretRecord, version: SecretVersion) -> Result<VersionId> {
        if let Some(existing) = record.version_in_stage(Stage::Pending) {
            if existing.token != version.token {
                return Err(
                    StoreError::AlreadyPending(record.secret_id.to_string()).into()
                );
            }
            // Retry of the in-flight token: replace in place, keep the id.
            let id = existing.version_id.clone();
            let secret_id = record.secret_id.to_string();
            let slot = record
                .version_in_stage_mut(Stage::Pending)
                .ok_or_else(|| StoreError::Conflict(secret_id))?;
            let mut replacement = version;
            replacement.version_id = id.clone();
            *slot = replacement;
            return Ok(id);
        }

        let id = version.version_id.clone();
        record.versions.push(version);
        Ok(id)
    }

    /// Apply a `promote_and_demote` to a loaded record.
    pub fn promote_and_demote(
        record: &mut SecretRecord,
        pending_version_id: &VersionId,
    ) -> Result<()> {
        let holds_slot = record
            .version_in_stage(Stage::Pending)
            .map(|v| &v.version_id == pending_version_id)
            .unwrap_or(false);
        if !holds_slot {
            return Err(StoreError::Conflict(record.secret_id.to_string()).into());
        }

        let now = Utc::now();
        if let Some(current) = record.version_in_stage_mut(Stage::Current) {
            current.stage = Stage::Previous;
            current.demoted_at = Some(now);
        }
        // holds_slot was verified above; the record is held exclusively for
        // the duration of this call.
        let secret_id = record.secret_id.to_string();
        let pending = record
            .version_in_stage_mut(Stage::Pending)
            .ok_or_else(|| StoreError::Conflict(secret_id))?;
        pending.stage = Stage::Current;
        pending.promoted_at = Some(now);

        Ok(())
    }

    /// Apply a `retire` to a loaded record.
    pub fn retire(record: &mut SecretRecord, version_id: &VersionId) -> Result<()> {
        let secret_id = record.secret_id.to_string();
        let version = record
            .versions
            .iter_mut()
            .find(|v| &v.version_id == version_id)
            .ok_or_else(|| StoreError::VersionNotFound(version_id.to_string()))?;

        if !version.stage.can_transition_to(Stage::Deprecated) {
            return Err(StoreError::Conflict(secret_id).into());
        }
        version.stage = Stage::Deprecated;
        Ok(())
    }

    /// Stage lookup used by `get`.
    pub fn get(record: &SecretRecord, secret_id: &SecretId, stage: Stage) -> Result<SecretVersion> {
        record
            .version_in_stage(stage)
            .cloned()
            .ok_or_else(|| {
                StoreError::NoVersionInStage {
                    secret_id: secret_id.to_string(),
                    stage: stage.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::record_ops;
    use crate::core::stage::Stage;
    use crate::core::types::{RotationToken, SecretId};
    use crate::core::version::{Credential, SecretRecord, SecretVersion};
    use crate::error::{Error, StoreError};

    fn pending(token: &str) -> SecretVersion {
        SecretVersion::pending(Credential::new("u", "s"), RotationToken::from(token))
    }

    #[test]
    fn test_put_rejects_second_token() {
        let mut record = SecretRecord::new(SecretId::from("s"));
        record_ops::put(&mut record, pending("t1")).unwrap();

        let err = record_ops::put(&mut record, pending("t2")).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::AlreadyPending(_))));
    }

    #[test]
    fn test_put_same_token_keeps_version_id() {
        let mut record = SecretRecord::new(SecretId::from("s"));
        let first = record_ops::put(&mut record, pending("t1")).unwrap();
        let second = record_ops::put(&mut record, pending("t1")).unwrap();
        assert_eq!(first, second);
        assert_eq!(record.count_in_stage(Stage::Pending), 1);
    }

    #[test]
    fn test_promote_without_prior_current() {
        let mut record = SecretRecord::new(SecretId::from("s"));
        let id = record_ops::put(&mut record, pending("t1")).unwrap();
        record_ops::promote_and_demote(&mut record, &id).unwrap();

        assert_eq!(record.count_in_stage(Stage::Current), 1);
        assert_eq!(record.count_in_stage(Stage::Pending), 0);
        assert_eq!(record.count_in_stage(Stage::Previous), 0);
    }

    #[test]
    fn test_promote_demotes_prior_current_in_same_step() {
        let mut record = SecretRecord::new(SecretId::from("s"));
        let v1 = record_ops::put(&mut record, pending("t1")).unwrap();
        record_ops::promote_and_demote(&mut record, &v1).unwrap();

        let v2 = record_ops::put(&mut record, pending("t2")).unwrap();
        record_ops::promote_and_demote(&mut record, &v2).unwrap();

        assert_eq!(record.count_in_stage(Stage::Current), 1);
        assert_eq!(record.count_in_stage(Stage::Previous), 1);
        assert_eq!(
            record.version_in_stage(Stage::Current).unwrap().version_id,
            v2
        );
        assert_eq!(
            record.version_in_stage(Stage::Previous).unwrap().version_id,
            v1
        );
    }

    #[test]
    fn test_promote_stale_id_conflicts() {
        let mut record = SecretRecord::new(SecretId::from("s"));
        let v1 = record_ops::put(&mut record, pending("t1")).unwrap();
        record_ops::promote_and_demote(&mut record, &v1).unwrap();

        // Second attempt with the now-promoted id must conflict.
        let err = record_ops::promote_and_demote(&mut record, &v1).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Conflict(_))));
    }

    #[test]
    fn test_retire_only_previous() {
        let mut record = SecretRecord::new(SecretId::from("s"));
        let v1 = record_ops::put(&mut record, pending("t1")).unwrap();
        record_ops::promote_and_demote(&mut record, &v1).unwrap();

        // Current cannot be retired.
        let err = record_ops::retire(&mut record, &v1).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Conflict(_))));

        let v2 = record_ops::put(&mut record, pending("t2")).unwrap();
        record_ops::promote_and_demote(&mut record, &v2).unwrap();
        record_ops::retire(&mut record, &v1).unwrap();
        assert_eq!(record.count_in_stage(Stage::Deprecated), 1);
    }
}
