//! Test support utilities for keyturn integration tests.
//!
//! Provides an isolated on-disk environment (store + target state under a
//! temp dir) and a scriptable adapter for failure injection. Coordinators
//! are built fresh on demand so tests can simulate a crashed-and-restarted
//! process over the same durable state.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use keyturn::core::adapter::{ApiKeyRegister, TargetAdapter};
use keyturn::core::coordinator::Coordinator;
use keyturn::core::store::FilesystemStore;
use keyturn::core::version::Credential;
use keyturn::error::{AdapterError, Result};
use keyturn::{RotationToken, SecretId};

/// Isolated test environment: a store directory and a target state file,
/// both under one temp dir.
pub struct Test {
    pub dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Build a coordinator over the environment's durable state, as a fresh
    /// process would.
    pub fn coordinator(&self) -> Coordinator<FilesystemStore, ApiKeyRegister> {
        let store =
            FilesystemStore::open(self.dir.path().join("store")).expect("failed to open store");
        Coordinator::new(store, self.register())
    }

    /// A handle on the simulated API-key register target.
    pub fn register(&self) -> ApiKeyRegister {
        ApiKeyRegister::open(self.dir.path().join("register.json"))
    }

    pub fn secret_id(&self) -> SecretId {
        SecretId::new("db-prod")
    }

    pub fn token(&self, s: &str) -> RotationToken {
        RotationToken::new(s)
    }
}

/// Which adapter operation to sabotage next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Apply,
    Test,
    Revoke,
}

/// What the sabotage should look like.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Target unreachable/timed out (retryable).
    Unavailable,
    /// Target rejects the credential (validation failure).
    Rejected,
}

#[derive(Default)]
struct ScriptedState {
    /// credential id -> secret; all entries authenticate.
    valid: BTreeMap<String, String>,
    faults: VecDeque<(Op, Fault)>,
    apply_calls: usize,
    test_calls: usize,
    revoke_calls: usize,
}

/// In-memory adapter with programmable failures, shared across clones so a
/// test can inspect the target while the coordinator drives it.
#[derive(Clone, Default)]
pub struct ScriptedAdapter {
    state: Arc<Mutex<ScriptedState>>,
    counter: Arc<Mutex<u32>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a fault for the next matching operation.
    pub fn fail_next(&self, op: Op, fault: Fault) {
        self.state
            .lock()
            .unwrap()
            .faults
            .push_back((op, fault));
    }

    /// Whether the given credential would authenticate right now.
    pub fn authenticates(&self, credential: &Credential) -> bool {
        let state = self.state.lock().unwrap();
        state.valid.get(credential.id()).map(String::as_str) == Some(credential.secret())
    }

    pub fn valid_count(&self) -> usize {
        self.state.lock().unwrap().valid.len()
    }

    pub fn apply_calls(&self) -> usize {
        self.state.lock().unwrap().apply_calls
    }

    pub fn test_calls(&self) -> usize {
        self.state.lock().unwrap().test_calls
    }

    fn take_fault(&self, op: Op) -> Option<Fault> {
        let mut state = self.state.lock().unwrap();
        if state.faults.front().map(|(o, _)| *o) == Some(op) {
            state.faults.pop_front().map(|(_, f)| f)
        } else {
            None
        }
    }

    fn trip(&self, op: Op, what: &str) -> Result<()> {
        match self.take_fault(op) {
            Some(Fault::Unavailable) => {
                Err(AdapterError::Unavailable(format!("{what}: connection timed out")).into())
            }
            Some(Fault::Rejected) => {
                Err(AdapterError::Rejected(format!("{what}: authentication failed")).into())
            }
            None => Ok(()),
        }
    }
}

impl TargetAdapter for ScriptedAdapter {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn generate(&self) -> Result<Credential> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        Ok(Credential::new(
            format!("user-{counter}"),
            format!("secret-{counter}"),
        ))
    }

    fn apply(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        self.state.lock().unwrap().apply_calls += 1;
        self.trip(Op::Apply, "apply")?;
        self.state
            .lock()
            .unwrap()
            .valid
            .insert(credential.id().to_string(), credential.secret().to_string());
        Ok(())
    }

    fn test(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        self.state.lock().unwrap().test_calls += 1;
        self.trip(Op::Test, "test")?;
        if self.authenticates(credential) {
            Ok(())
        } else {
            Err(AdapterError::Rejected(format!(
                "credential {} does not authenticate",
                credential.id()
            ))
            .into())
        }
    }

    fn revoke(&self, credential: &Credential, _timeout: Duration) -> Result<()> {
        self.state.lock().unwrap().revoke_calls += 1;
        self.trip(Op::Revoke, "revoke")?;
        self.state.lock().unwrap().valid.remove(credential.id());
        Ok(())
    }
}
