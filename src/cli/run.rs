//! Run command: invoke a single rotation phase.
//!
//! This is the trigger contract surfaced for operators and external
//! schedulers: `(secret_id, phase, token) -> status + detail`. Repeating a
//! call with the same token is always safe.

use std::process::exit;

use crate::cli::output;
use crate::cli::Context;
use crate::core::audit::Outcome;
use crate::core::phase::Phase;
use crate::core::types::{RotationToken, SecretId};
use crate::error::Result;

pub fn execute(secret_id: &str, phase: &str, token: &str) -> Result<()> {
    let phase: Phase = phase.parse().map_err(crate::error::Error::Rotation)?;
    let ctx = Context::load()?;

    let invocation = ctx.coordinator.invoke(
        &SecretId::new(secret_id),
        phase,
        &RotationToken::new(token),
    );

    match invocation.status {
        Outcome::Success => {
            output::success(&format!("{phase}: {}", invocation.detail));
        }
        Outcome::InProgress => {
            output::warn(&format!("{phase}: {}", invocation.detail));
            output::hint("another rotation holds this secret; wait or investigate its token");
        }
        Outcome::Failed => {
            output::error(&format!("{phase}: {}", invocation.detail));
            exit(1);
        }
    }

    Ok(())
}
