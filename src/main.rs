//! Keyturn - zero-downtime credential rotation coordinator.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keyturn::cli::output;
use keyturn::cli::{execute, Cli};
use keyturn::error::{ConfigError, Error};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("KEYTURN_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("keyturn=debug")
        } else {
            EnvFilter::new("keyturn=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    if let Err(e) = execute(cli.command) {
        let suggestion = match &e {
            Error::Config(ConfigError::NotInitialized) => Some("run: keyturn init"),
            Error::Rotation(keyturn::error::RotationError::InProgress { .. }) => {
                Some("wait for the in-flight rotation or check its token with: keyturn status")
            }
            _ if e.is_retryable() => Some("transient failure; the same call is safe to retry"),
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
