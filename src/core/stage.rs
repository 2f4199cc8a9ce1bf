//! Stage labels for secret versions.

use serde::{Deserialize, Serialize};

/// Role of a credential version within its secret.
///
/// ```text
/// Pending → Current → Previous → Deprecated
/// ```
///
/// At most one version is `Pending` and at most one is `Current` at any
/// time; promotion moves `Pending → Current` and the displaced `Current →
/// Previous` in a single atomic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Created but not yet live; a rotation in flight.
    Pending,
    /// The credential callers should be using.
    Current,
    /// Displaced by a promotion; still valid on the target until revoked.
    Previous,
    /// Revoked; kept only until the retention policy purges it.
    Deprecated,
}

impl Stage {
    /// Stages a version can move to from this one.
    pub fn can_transition_to(self, target: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, target),
            (Pending, Current) | (Current, Previous) | (Previous, Deprecated)
        )
    }

    /// Whether a credential in this stage must still authenticate on the
    /// target. `Pending` counts once it has been applied.
    pub fn is_live(self) -> bool {
        !matches!(self, Stage::Deprecated)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Pending => write!(f, "pending"),
            Stage::Current => write!(f, "current"),
            Stage::Previous => write!(f, "previous"),
            Stage::Deprecated => write!(f, "deprecated"),
        }
    }
}
