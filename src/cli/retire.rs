//! Retire command: grace-period cleanup of previous versions.

use crate::cli::output;
use crate::cli::Context;
use crate::core::types::SecretId;
use crate::error::Result;

pub fn execute(secret_id: &str) -> Result<()> {
    let ctx = Context::load()?;
    let retired = ctx.coordinator.retire_previous(&SecretId::new(secret_id))?;

    if retired.is_empty() {
        output::dimmed("nothing to retire (no previous versions past the grace period)");
    } else {
        for version_id in &retired {
            output::success(&format!("revoked and deprecated version {version_id}"));
        }
    }

    Ok(())
}
