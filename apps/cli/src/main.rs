//! `locksmith` - rotate signing secrets and issue JWTs from the command line

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{AppConfig, Overrides};

#[derive(Debug, Parser)]
#[command(name = "locksmith", version, about = "Zero-downtime signing secret rotation")]
struct Cli {
    /// Configuration file (default: locksmith.toml)
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `locksmith_rotation=trace`
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    /// Log output format: pretty, compact or json
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<locksmith_log::Format>,

    /// Directory of the local secret store
    #[arg(long, global = true, value_name = "DIR")]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the store and rotate the signing secret once
    Rotate,
    /// Show the newest stored secret
    Status,
    /// Rotate periodically until Ctrl-C
    Run,
    /// Sign a JSON claim set
    Sign {
        /// Claims as a JSON object
        #[arg(long)]
        claims: String,
    },
    /// Validate a token and print its claims
    Verify {
        /// Compact JWT
        token: String,
    },
    /// Print the active secret as hex
    Export,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = Overrides {
        log_level: cli.log_level,
        log_format: cli.log_format,
        store_path: cli.store_path,
    };
    let config = AppConfig::load(cli.config.as_deref(), &overrides)?;
    locksmith_log::init(config.log.clone()).context("failed to initialize logging")?;

    match cli.command {
        Command::Rotate => commands::rotate(&config).await,
        Command::Status => commands::status(&config).await,
        Command::Run => commands::run(&config).await,
        Command::Sign { claims } => commands::sign(&config, &claims).await,
        Command::Verify { token } => commands::verify(&config, &token).await,
        Command::Export => commands::export(&config).await,
    }
}
