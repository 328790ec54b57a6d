//! Flagsync CLI — `flagsync` command.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use flagsync_core::config::Config;
use flagsync_source::MemorySource;

/// Exit status for a missing credential, distinguishable from generic
/// failures.
const EXIT_MISSING_CREDENTIAL: i32 = 2;

/// Flagsync — keeps a local .env file in sync with remotely managed
/// feature flags.
#[derive(Parser)]
#[command(name = "flagsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync daemon in the foreground until a stop signal.
    Run,
    /// Print the resolved configuration as JSON (credential redacted).
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_daemon(),
        Commands::Config => show_config(),
    }
}

fn run_daemon() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    if let Err(err) = config.require_credential() {
        eprintln!("{err}");
        std::process::exit(EXIT_MISSING_CREDENTIAL);
    }

    // No remote transport is wired in yet; the in-process source
    // exercises the full pipeline with fallback values. An SDK-backed
    // `Connection` drops in behind the same trait.
    let connection = Arc::new(MemorySource::new());
    flagsync_daemon::start_blocking(config, connection).context("daemon exited with error")
}

fn show_config() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let payload = serde_json::json!({
        "credential_set": config.require_credential().is_ok(),
        "tracked_keys": config
            .tracked_keys
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>(),
        "env_file": config.env_file.display().to_string(),
        "backup_enabled": config.backup_enabled,
        "log_level": config.log_level,
        "debounce_ms": config.debounce_ms,
        "context": {
            "key": &config.context.key,
            "name": &config.context.name,
        },
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to render config JSON")?
    );
    Ok(())
}
