//! Command-line interface.
//!
//! A thin operator trigger over the coordinator: each subcommand maps onto
//! the external invocation contract (phase name + idempotency token) or a
//! read-only status view. Manual secret editing is deliberately absent.

pub mod completions;
pub mod init;
pub mod output;
pub mod retire;
pub mod rotate;
pub mod run;
pub mod status;

use clap::{Parser, Subcommand};

use crate::core::adapter::{ApiKeyRegister, ScramBroker, TargetAdapter};
use crate::core::audit::{AuditSink, JsonlSink, TracingSink};
use crate::core::config::{AdapterKind, Config};
use crate::core::coordinator::Coordinator;
use crate::core::store::FilesystemStore;
use crate::error::Result;

/// Keyturn - zero-downtime credential rotation.
#[derive(Parser)]
#[command(
    name = "keyturn",
    about = "Zero-downtime credential rotation coordinator",
    version
)]
pub struct Cli {
    /// Verbose logging (same as KEYTURN_LOG=keyturn=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Write a starter .keyturn.toml in the current directory
    Init {
        /// Target adapter kind: api-key or scram
        #[arg(long, default_value = "api-key")]
        adapter: String,
    },

    /// Invoke a single rotation phase
    Run {
        /// Logical secret id (e.g., db-prod)
        secret_id: String,
        /// Phase name: createSecret, setSecret, testSecret or finishSecret
        phase: String,
        /// Idempotency token for this rotation attempt
        #[arg(short, long)]
        token: String,
    },

    /// Drive all four phases in order
    Rotate {
        /// Logical secret id
        secret_id: String,
        /// Idempotency token (generated when omitted)
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Revoke and deprecate previous versions past the grace period
    Retire {
        /// Logical secret id
        secret_id: String,
    },

    /// Show stage layout for one secret, or list all secrets
    Status {
        /// Logical secret id (all secrets when omitted)
        secret_id: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Everything a command needs: a coordinator wired from `.keyturn.toml`.
pub struct Context {
    pub coordinator: Coordinator<FilesystemStore, Box<dyn TargetAdapter>>,
    pub config: Config,
}

impl Context {
    /// Build the coordinator from the on-disk configuration.
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let store = FilesystemStore::open(config.store_dir.clone())?;

        let adapter: Box<dyn TargetAdapter> = match config.adapter.kind {
            AdapterKind::ApiKey => {
                Box::new(ApiKeyRegister::open(config.adapter.state_path.clone()))
            }
            AdapterKind::Scram => Box::new(ScramBroker::open(
                config.adapter.principal.clone().unwrap_or_default(),
                config.adapter.state_path.clone(),
            )),
        };

        let audit: Box<dyn AuditSink> = match &config.audit_log {
            Some(path) => Box::new(JsonlSink::new(path.clone())),
            None => Box::new(TracingSink),
        };

        let coordinator = Coordinator::new(store, adapter)
            .with_audit(audit)
            .with_adapter_timeout(config.adapter_timeout())
            .with_grace_period(config.grace_period());

        Ok(Self {
            coordinator,
            config,
        })
    }
}

/// Execute a command.
pub fn execute(command: Command) -> Result<()> {
    use Command::*;

    match command {
        Init { adapter } => init::execute(&adapter),
        Run {
            secret_id,
            phase,
            token,
        } => run::execute(&secret_id, &phase, &token),
        Rotate { secret_id, token } => rotate::execute(&secret_id, token.as_deref()),
        Retire { secret_id } => retire::execute(&secret_id),
        Status { secret_id } => status::execute(secret_id.as_deref()),
        Completions { shell } => completions::execute(shell),
    }
}
