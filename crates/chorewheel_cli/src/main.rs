//! CLI smoke and diagnostic entry point.
//!
//! # Responsibility
//! - Verify `chorewheel_core` linkage with a deterministic probe.
//! - Evaluate one recurrence rule from a JSON file for quick local checks.
//!
//! Without a subcommand the binary only prints ping and version.

use chorewheel_core::{DueDateCalculator, EngineConfig, RecurrenceRule};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "chorewheel_cli")]
#[command(about = "Diagnostics for the chorewheel recurrence engine")]
struct Cli {
    /// Engine config file (TOML); defaults apply when omitted
    #[arg(short, long, env = "CHOREWHEEL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for rolling log files; logging stays off when omitted
    #[arg(long, env = "CHOREWHEEL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the due date that follows a reference instant
    NextDue {
        /// JSON file holding one recurrence rule in wire form
        rule: PathBuf,
        /// Reference instant (RFC 3339)
        reference: DateTime<Utc>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let Some(command) = cli.command else {
        println!("chorewheel_core ping={}", chorewheel_core::ping());
        println!("chorewheel_core version={}", chorewheel_core::core_version());
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;
    if let Some(log_dir) = cli.log_dir.as_deref() {
        start_logging(&config, log_dir)?;
    }

    match command {
        Command::NextDue { rule, reference } => {
            println!("{}", next_due(&config, &rule, reference)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path).map_err(|err| err.to_string())?,
        None => EngineConfig::default(),
    };
    config
        .apply_overrides(|key| std::env::var(key).ok())
        .map_err(|err| err.to_string())?;
    Ok(config)
}

fn start_logging(config: &EngineConfig, log_dir: &Path) -> Result<(), String> {
    let log_dir = if log_dir.is_absolute() {
        log_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| format!("cannot resolve working directory: {err}"))?
            .join(log_dir)
    };
    chorewheel_core::init_logging(config.effective_log_level(), &log_dir)
        .map_err(|err| err.to_string())
}

fn next_due(
    config: &EngineConfig,
    rule_path: &Path,
    reference: DateTime<Utc>,
) -> Result<String, String> {
    let raw = std::fs::read_to_string(rule_path)
        .map_err(|err| format!("cannot read `{}`: {err}", rule_path.display()))?;
    let rule: RecurrenceRule =
        serde_json::from_str(raw.as_str()).map_err(|err| format!("invalid rule: {err}"))?;

    let calculator = DueDateCalculator::from_config(config);
    match calculator.compute_next_due_date(&rule, reference, &[]) {
        Ok(Some(due)) => Ok(due.to_rfc3339()),
        Ok(None) => Ok("none".to_string()),
        Err(err) => Err(err.to_string()),
    }
}
