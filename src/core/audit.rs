//! Audit sink for phase transitions.
//!
//! One append-only event per phase invocation. Auditing is fire-and-forget:
//! a sink that cannot write logs a warning and drops the event, it never
//! blocks or fails the rotation itself.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::phase::Phase;
use crate::core::types::{RotationToken, SecretId};

/// Outcome of one phase invocation, as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
    InProgress,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::InProgress => write!(f, "in_progress"),
        }
    }
}

/// One audit event per phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub secret_id: SecretId,
    pub phase: Phase,
    pub token: RotationToken,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    pub detail: String,
}

impl AuditEvent {
    pub fn new(
        secret_id: &SecretId,
        phase: Phase,
        token: &RotationToken,
        outcome: Outcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.clone(),
            phase,
            token: token.clone(),
            timestamp: Utc::now(),
            outcome,
            detail: detail.into(),
        }
    }
}

/// Append-only audit destination.
pub trait AuditSink: Send + Sync {
    /// Record one event. Implementations must swallow their own failures.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that emits structured `tracing` events.
#[derive(Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, event: &AuditEvent) {
        info!(
            secret = %event.secret_id,
            phase = %event.phase,
            token = %event.token,
            outcome = %event.outcome,
            detail = %event.detail,
            "rotation phase"
        );
    }
}

/// Audit sink appending one JSON line per event to a file.
pub struct JsonlSink {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn append(&self, event: &AuditEvent) -> std::io::Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl AuditSink for JsonlSink {
    fn record(&self, event: &AuditEvent) {
        if let Err(e) = self.append(event) {
            warn!(path = %self.path.display(), error = %e, "audit write dropped");
        }
    }
}

/// In-memory audit sink for tests.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
