//! Configuration file management.
//!
//! Handles reading, writing, and validating `.keyturn.toml`, which wires a
//! store directory and a target adapter to the coordinator for operator use.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::store::FilesystemStore;
use crate::error::{ConfigError, Result};

/// Config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".keyturn.toml";

/// Which target adapter variant to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    /// Generic API-token register.
    ApiKey,
    /// Message-broker SASL/SCRAM principal.
    Scram,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterKind::ApiKey => write!(f, "api-key"),
            AdapterKind::Scram => write!(f, "scram"),
        }
    }
}

impl std::str::FromStr for AdapterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "api-key" => Ok(AdapterKind::ApiKey),
            "scram" => Ok(AdapterKind::Scram),
            other => Err(ConfigError::UnknownAdapter(other.to_string())),
        }
    }
}

/// Target adapter section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Adapter variant.
    pub kind: AdapterKind,
    /// Where the adapter keeps its target state.
    pub state_path: PathBuf,
    /// SASL principal (scram adapter only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
}

/// Rotation timing section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Timeout for each adapter call, in seconds.
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,
    /// Delay before a displaced credential may be revoked, in seconds.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}

fn default_adapter_timeout_secs() -> u64 {
    10
}

fn default_grace_period_secs() -> u64 {
    24 * 60 * 60
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: default_adapter_timeout_secs(),
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

/// Operator configuration stored in `.keyturn.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the versioned secret records.
    pub store_dir: PathBuf,
    /// Optional JSONL audit log path; tracing-only auditing when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Config {
    /// A fresh config with defaults for the given adapter kind.
    pub fn new(kind: AdapterKind) -> Self {
        let base = FilesystemStore::default_dir();
        let state_path = base
            .parent()
            .map(|p| p.join("targets").join("state.json"))
            .unwrap_or_else(|| PathBuf::from("state.json"));
        Self {
            store_dir: base,
            adapter: AdapterConfig {
                kind,
                state_path,
                principal: matches!(kind, AdapterKind::Scram).then(|| "app".to_string()),
            },
            timing: TimingConfig::default(),
            audit_log: None,
        }
    }

    /// Path to the configuration file in the current directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    pub fn exists() -> bool {
        Self::config_path().exists()
    }

    /// Load configuration from `.keyturn.toml`.
    ///
    /// # Errors
    ///
    /// `ConfigError::NotInitialized` if the file doesn't exist,
    /// `ConfigError::Parse` if the TOML is malformed, or
    /// `ConfigError::Invalid` if validation fails.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotInitialized.into());
        }
        let contents = std::fs::read_to_string(&path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `.keyturn.toml`.
    pub fn save(&self) -> Result<()> {
        debug!("saving config");
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(Self::config_path(), contents)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.adapter.kind == AdapterKind::Scram
            && self.adapter.principal.as_deref().unwrap_or("").is_empty()
        {
            return Err(
                ConfigError::Invalid("scram adapter requires a principal".to_string()).into(),
            );
        }
        if self.timing.adapter_timeout_secs == 0 {
            return Err(
                ConfigError::Invalid("adapter_timeout_secs must be positive".to_string()).into(),
            );
        }
        Ok(())
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.timing.adapter_timeout_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.timing.grace_period_secs)
    }
}
