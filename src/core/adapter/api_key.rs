//! Generic API-token register adapter.
//!
//! Models the common "API key register" target: a service that accepts any
//! number of simultaneously valid keys. The register state is a JSON file so
//! that rotations driven from separate processes (or a crashed-and-restarted
//! coordinator) observe the same target.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{random_secret, TargetAdapter};
use crate::core::version::Credential;
use crate::error::{AdapterError, Result};

const KEY_LEN: usize = 40;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegisterState {
    /// key id -> secret token. Every entry authenticates.
    keys: BTreeMap<String, String>,
}

/// An API-key register target.
pub struct ApiKeyRegister {
    state_path: PathBuf,
    io_guard: Mutex<()>,
}

impl ApiKeyRegister {
    pub fn open(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            io_guard: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<RegisterState> {
        if !self.state_path.exists() {
            return Ok(RegisterState::default());
        }
        let contents = fs::read_to_string(&self.state_path)
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        serde_json::from_str(&contents)
            .map_err(|e| AdapterError::State(e.to_string()).into())
    }

    fn save(&self, state: &RegisterState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| AdapterError::State(e.to_string()))?;
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        }
        fs::write(&self.state_path, contents)
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        Ok(())
    }

    /// Number of currently valid keys. Used by tests to observe the
    /// dual-validity window.
    pub fn valid_key_count(&self) -> Result<usize> {
        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.keys.len())
    }
}

impl TargetAdapter for ApiKeyRegister {
    fn kind(&self) -> &'static str {
        "api-key"
    }

    fn generate(&self) -> Result<Credential> {
        let key_id = format!("ak_{}", random_secret(12).to_lowercase());
        Ok(Credential::new(key_id, random_secret(KEY_LEN)))
    }

    fn apply(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = self.load()?;
        let already = state.keys.get(credential.id()).map(String::as_str)
            == Some(credential.secret());
        if !already {
            state
                .keys
                .insert(credential.id().to_string(), credential.secret().to_string());
            self.save(&state)?;
        }
        debug!(key = credential.id(), already, "api key applied");
        Ok(())
    }

    fn test(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        let state = self.load()?;
        match state.keys.get(credential.id()) {
            Some(secret) if secret == credential.secret() => Ok(()),
            Some(_) => Err(AdapterError::Rejected(format!(
                "key {} present but secret does not match",
                credential.id()
            ))
            .into()),
            None => {
                Err(AdapterError::Rejected(format!("unknown key {}", credential.id())).into())
            }
        }
    }

    fn revoke(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = self.load()?;
        if state.keys.remove(credential.id()).is_some() {
            self.save(&state)?;
        }
        debug!(key = credential.id(), "api key revoked");
        Ok(())
    }
}
