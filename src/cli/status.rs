//! Status command: stage layout per secret.

use crate::cli::output;
use crate::cli::Context;
use crate::core::stage::Stage;
use crate::core::store::SecretStore;
use crate::core::types::SecretId;
use crate::error::Result;

const STAGES: [Stage; 4] = [Stage::Pending, Stage::Current, Stage::Previous, Stage::Deprecated];

fn show_secret(ctx: &Context, secret_id: &SecretId) -> Result<()> {
    output::section(secret_id.as_str());
    for stage in STAGES {
        let versions = ctx.coordinator.store().list_by_stage(secret_id, stage)?;
        for version in versions {
            output::kv(
                &stage.to_string(),
                format!(
                    "{}  (token {}, created {})",
                    version.version_id,
                    version.token,
                    version.created_at.format("%Y-%m-%d %H:%M:%S")
                ),
            );
        }
    }
    Ok(())
}

pub fn execute(secret_id: Option<&str>) -> Result<()> {
    let ctx = Context::load()?;

    match secret_id {
        Some(id) => show_secret(&ctx, &SecretId::new(id))?,
        None => {
            let ids = ctx.coordinator.store().list_secrets()?;
            if ids.is_empty() {
                output::dimmed("no secrets in store");
                return Ok(());
            }
            for id in ids {
                show_secret(&ctx, &id)?;
            }
        }
    }

    Ok(())
}
