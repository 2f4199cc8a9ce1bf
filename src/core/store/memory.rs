//! In-memory secret store.
//!
//! Mutex-guarded map with the same revision discipline as the filesystem
//! backend. Used by unit tests and the concurrency property tests; also
//! handy for embedding the coordinator in a larger process that brings its
//! own durability.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{record_ops, SecretStore};
use crate::core::stage::Stage;
use crate::core::types::{SecretId, VersionId};
use crate::core::version::{SecretRecord, SecretVersion};
use crate::error::{Result, StoreError};

/// In-memory secret store.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<SecretId, SecretRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<T>(
        &self,
        secret_id: &SecretId,
        f: impl FnOnce(&mut SecretRecord) -> Result<T>,
    ) -> Result<T> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let record = records
            .entry(secret_id.clone())
            .or_insert_with(|| SecretRecord::new(secret_id.clone()));
        let out = f(record)?;
        record.revision += 1;
        Ok(out)
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, secret_id: &SecretId, stage: Stage) -> Result<SecretVersion> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get(secret_id)
            .ok_or_else(|| StoreError::NotFound(secret_id.to_string()))?;
        record_ops::get(record, secret_id, stage)
    }

    fn put(&self, secret_id: &SecretId, version: SecretVersion) -> Result<VersionId> {
        self.with_record(secret_id, |record| record_ops::put(record, version))
    }

    fn promote_and_demote(
        &self,
        secret_id: &SecretId,
        pending_version_id: &VersionId,
    ) -> Result<()> {
        self.with_record(secret_id, |record| {
            record_ops::promote_and_demote(record, pending_version_id)
        })
    }

    fn list_by_stage(&self, secret_id: &SecretId, stage: Stage) -> Result<Vec<SecretVersion>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get(secret_id)
            .ok_or_else(|| StoreError::NotFound(secret_id.to_string()))?;
        Ok(record
            .versions
            .iter()
            .filter(|v| v.stage == stage)
            .cloned()
            .collect())
    }

    fn retire(&self, secret_id: &SecretId, version_id: &VersionId) -> Result<()> {
        self.with_record(secret_id, |record| record_ops::retire(record, version_id))
    }

    fn list_secrets(&self) -> Result<Vec<SecretId>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.keys().cloned().collect())
    }
}
