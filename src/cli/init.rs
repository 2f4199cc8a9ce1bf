//! Init command.
//!
//! Writes a starter `.keyturn.toml` in the current directory.

use crate::cli::output;
use crate::core::config::{AdapterKind, Config};
use crate::error::{ConfigError, Result};

pub fn execute(adapter: &str) -> Result<()> {
    if Config::exists() {
        return Err(ConfigError::AlreadyInitialized.into());
    }

    let kind: AdapterKind = adapter.parse()?;
    let config = Config::new(kind);
    config.save()?;

    output::success("initialized");
    output::kv("config", Config::config_path().display());
    output::kv("adapter", kind);
    output::kv("store", config.store_dir.display());
    output::hint("edit .keyturn.toml to point at your target, then run: keyturn rotate <SECRET_ID>");

    Ok(())
}
