//! Credential payloads and versioned secret records.
//!
//! All rotation progress lives here, in durable state, so that any process
//! instance can resume any phase after a crash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::stage::Stage;
use crate::core::types::{RotationToken, SecretId, VersionId};

/// An opaque credential payload, meaningful only to a target adapter.
///
/// `id` is the public half (username, key id, SASL principal); `secret` is
/// the material that must never outlive its use. The secret half is zeroized
/// on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    id: String,
    secret: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// Public identifier (safe to log).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Secret material. Callers must not log or persist this outside the
    /// secret store.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

// Never leak secret material through Debug output.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One version of a secret, with the rotation progress that makes phase
/// ordering explicit durable state rather than caller convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretVersion {
    pub version_id: VersionId,
    pub credential: Credential,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    /// Token of the rotation attempt that created this version.
    pub token: RotationToken,
    /// Set when `setSecret` has made the credential valid on the target.
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,
    /// Set when `testSecret` has proven the credential works end-to-end.
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    /// Set when this version was promoted to `Current` (and, on the
    /// displaced version, when it was demoted to `Previous`).
    #[serde(default)]
    pub promoted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub demoted_at: Option<DateTime<Utc>>,
}

impl SecretVersion {
    /// Create a fresh pending version for a rotation attempt.
    pub fn pending(credential: Credential, token: RotationToken) -> Self {
        Self {
            version_id: VersionId::generate(),
            credential,
            stage: Stage::Pending,
            created_at: Utc::now(),
            token,
            applied_at: None,
            validated_at: None,
            promoted_at: None,
            demoted_at: None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }

    pub fn is_validated(&self) -> bool {
        self.validated_at.is_some()
    }
}

/// Durable record of a secret: its ordered versions plus the optimistic
/// revision counter that serializes all mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub secret_id: SecretId,
    /// Incremented on every committed mutation; compared before commit to
    /// detect a concurrent writer.
    pub revision: u64,
    pub versions: Vec<SecretVersion>,
}

impl SecretRecord {
    pub fn new(secret_id: SecretId) -> Self {
        Self {
            secret_id,
            revision: 0,
            versions: Vec::new(),
        }
    }

    /// First version in the given stage, if any.
    pub fn version_in_stage(&self, stage: Stage) -> Option<&SecretVersion> {
        self.versions.iter().find(|v| v.stage == stage)
    }

    pub fn version_in_stage_mut(&mut self, stage: Stage) -> Option<&mut SecretVersion> {
        self.versions.iter_mut().find(|v| v.stage == stage)
    }

    pub fn find_version(&self, version_id: &VersionId) -> Option<&SecretVersion> {
        self.versions.iter().find(|v| &v.version_id == version_id)
    }

    pub fn count_in_stage(&self, stage: Stage) -> usize {
        self.versions.iter().filter(|v| v.stage == stage).count()
    }
}
