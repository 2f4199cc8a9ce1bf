//! Message-broker SASL/SCRAM adapter.
//!
//! Models a broker whose SASL principals can hold several salted password
//! verifiers at once (the broker-side convention that makes password
//! rotation possible without kicking connected clients): `apply` adds a
//! second verifier alongside the existing one, and both passwords
//! authenticate until the old verifier is revoked.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{random_secret, TargetAdapter};
use crate::core::version::Credential;
use crate::error::{AdapterError, Result};

const PASSWORD_LEN: usize = 32;
const SALT_LEN: usize = 16;
const ITERATIONS: u32 = 4096;

/// One salted password verifier held by a principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Verifier {
    salt: String,
    iterations: u32,
    stored_key: String,
}

impl Verifier {
    fn derive(salt: &str, iterations: u32, password: &str) -> String {
        let mut digest = Sha256::new()
            .chain_update(salt.as_bytes())
            .chain_update(password.as_bytes())
            .finalize();
        for _ in 1..iterations {
            digest = Sha256::digest(&digest);
        }
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn new(password: &str) -> Self {
        let salt = random_secret(SALT_LEN);
        let stored_key = Self::derive(&salt, ITERATIONS, password);
        Self {
            salt,
            iterations: ITERATIONS,
            stored_key,
        }
    }

    fn verifies(&self, password: &str) -> bool {
        Self::derive(&self.salt, self.iterations, password) == self.stored_key
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BrokerState {
    /// principal -> all verifiers that currently authenticate.
    principals: BTreeMap<String, Vec<Verifier>>,
}

/// A SASL/SCRAM message-broker target for one principal.
pub struct ScramBroker {
    principal: String,
    state_path: PathBuf,
    io_guard: Mutex<()>,
}

impl ScramBroker {
    pub fn open(principal: impl Into<String>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            principal: principal.into(),
            state_path: state_path.into(),
            io_guard: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BrokerState> {
        if !self.state_path.exists() {
            return Ok(BrokerState::default());
        }
        let contents = fs::read_to_string(&self.state_path)
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        serde_json::from_str(&contents)
            .map_err(|e| AdapterError::State(e.to_string()).into())
    }

    fn save(&self, state: &BrokerState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| AdapterError::State(e.to_string()))?;
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        }
        fs::write(&self.state_path, contents)
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        Ok(())
    }

    /// Number of verifiers the principal currently holds.
    pub fn verifier_count(&self) -> Result<usize> {
        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        let state = self.load()?;
        Ok(state
            .principals
            .get(&self.principal)
            .map(Vec::len)
            .unwrap_or(0))
    }
}

impl TargetAdapter for ScramBroker {
    fn kind(&self) -> &'static str {
        "scram"
    }

    fn generate(&self) -> Result<Credential> {
        Ok(Credential::new(
            self.principal.clone(),
            random_secret(PASSWORD_LEN),
        ))
    }

    fn apply(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        if credential.id() != self.principal {
            return Err(AdapterError::Rejected(format!(
                "adapter manages principal {}, not {}",
                self.principal,
                credential.id()
            ))
            .into());
        }

        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = self.load()?;
        let verifiers = state.principals.entry(self.principal.clone()).or_default();

        // Re-applying the same password must not pile up duplicates.
        if verifiers.iter().any(|v| v.verifies(credential.secret())) {
            debug!(principal = %self.principal, "verifier already present");
            return Ok(());
        }

        verifiers.push(Verifier::new(credential.secret()));
        self.save(&state)?;
        debug!(principal = %self.principal, "verifier added");
        Ok(())
    }

    fn test(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        let state = self.load()?;
        let authenticated = state
            .principals
            .get(credential.id())
            .map(|verifiers| verifiers.iter().any(|v| v.verifies(credential.secret())))
            .unwrap_or(false);

        if authenticated {
            Ok(())
        } else {
            Err(AdapterError::Rejected(format!(
                "SASL authentication failed for principal {}",
                credential.id()
            ))
            .into())
        }
    }

    fn revoke(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        let _guard = self.io_guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut state = self.load()?;
        if let Some(verifiers) = state.principals.get_mut(credential.id()) {
            let before = verifiers.len();
            verifiers.retain(|v| !v.verifies(credential.secret()));
            if verifiers.len() != before {
                self.save(&state)?;
                debug!(principal = credential.id(), "verifier revoked");
            }
        }
        Ok(())
    }
}
