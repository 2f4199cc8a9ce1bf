//! Identifier newtypes for domain concepts.
//!
//! Keeps secret IDs, version IDs and rotation tokens from being mixed up in
//! function signatures.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a logical credential, independent of version
/// (e.g., "db-prod", "broker-sasl").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretId(String);

impl SecretId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SecretId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque unique identifier of one secret version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Generate a fresh version id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Caller-supplied idempotency key scoped to one rotation attempt.
///
/// Repeated phase calls with the same token are retries of the same logical
/// step, never new operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RotationToken(String);

impl RotationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RotationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RotationToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ids_are_unique() {
        assert_ne!(VersionId::generate(), VersionId::generate());
    }

    #[test]
    fn test_secret_id_display_roundtrip() {
        let id = SecretId::new("db-prod");
        assert_eq!(id.to_string(), "db-prod");
        assert_eq!(id.as_str(), "db-prod");
    }

    #[test]
    fn test_token_equality() {
        assert_eq!(RotationToken::from("t1"), RotationToken::new("t1"));
        assert_ne!(RotationToken::from("t1"), RotationToken::from("t2"));
    }
}
