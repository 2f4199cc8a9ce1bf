//! Rotate command: drive all four phases in order.

use std::process::exit;

use uuid::Uuid;

use crate::cli::output;
use crate::cli::Context;
use crate::core::audit::Outcome;
use crate::core::phase::Phase;
use crate::core::types::{RotationToken, SecretId};
use crate::error::Result;

/// Execute a full rotation.
///
/// 1. createSecret — stage a fresh credential as pending
/// 2. setSecret    — make it valid on the target alongside the old one
/// 3. testSecret   — prove it authenticates end-to-end
/// 4. finishSecret — atomically promote it to current
pub fn execute(secret_id: &str, token: Option<&str>) -> Result<()> {
    let secret_id = SecretId::new(secret_id);
    let token = token
        .map(RotationToken::new)
        .unwrap_or_else(|| RotationToken::new(Uuid::new_v4().to_string()));

    output::section(&format!("Rotating {}", secret_id));
    output::kv("token", &token);

    let ctx = Context::load()?;
    for phase in Phase::ALL {
        let invocation = ctx.coordinator.invoke(&secret_id, phase, &token);
        match invocation.status {
            Outcome::Success => output::success(&format!("{phase}: {}", invocation.detail)),
            Outcome::InProgress => {
                output::warn(&format!("{phase}: {}", invocation.detail));
                output::hint("another rotation holds this secret; wait or investigate its token");
                exit(1);
            }
            Outcome::Failed => {
                output::error(&format!("{phase}: {}", invocation.detail));
                output::hint(&format!(
                    "after fixing the cause, resume with: keyturn run {} {} --token {}",
                    secret_id, phase, token
                ));
                exit(1);
            }
        }
    }

    println!();
    output::success("rotation complete");
    output::dimmed("the previous credential stays valid until `keyturn retire` runs");

    Ok(())
}
