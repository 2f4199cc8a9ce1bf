//! Rotation phase names.

use serde::{Deserialize, Serialize};

use crate::error::RotationError;

/// The four phases of the rotation protocol, in invocation order.
///
/// ```text
/// createSecret → setSecret → testSecret → finishSecret
/// ```
///
/// Each phase is invoked independently by phase name plus idempotency
/// token; the coordinator rejects a phase whose precondition state has not
/// been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Generate a new credential and stage it as pending.
    CreateSecret,
    /// Make the pending credential valid on the target alongside the old one.
    SetSecret,
    /// Prove the pending credential authenticates end-to-end.
    TestSecret,
    /// Atomically promote pending to current.
    FinishSecret,
}

impl Phase {
    /// All phases in protocol order.
    pub const ALL: [Phase; 4] = [
        Phase::CreateSecret,
        Phase::SetSecret,
        Phase::TestSecret,
        Phase::FinishSecret,
    ];

    /// Wire name used by triggers and the audit log.
    pub fn name(self) -> &'static str {
        match self {
            Phase::CreateSecret => "createSecret",
            Phase::SetSecret => "setSecret",
            Phase::TestSecret => "testSecret",
            Phase::FinishSecret => "finishSecret",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Phase {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createSecret" => Ok(Phase::CreateSecret),
            "setSecret" => Ok(Phase::SetSecret),
            "testSecret" => Ok(Phase::TestSecret),
            "finishSecret" => Ok(Phase::FinishSecret),
            other => Err(RotationError::UnknownPhase(other.to_string())),
        }
    }
}
