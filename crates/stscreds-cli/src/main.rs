//! stscreds - keep MFA-backed AWS session credentials fresh.
//!
//! `init` stores long-lived bootstrap keys, `auth` exchanges them plus an MFA
//! code for session credentials, and `read` prints a session field,
//! re-authenticating first if the session has expired.

mod cli;
mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use stscreds_core::{Config, Overrides, Settings};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

/// Exit status for any unrecovered error.
const EXIT_FAILURE: i32 = 2;

/// Initialize the tracing subscriber for logging
fn init_tracing(verbose: bool) {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(EXIT_FAILURE);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let settings = Settings::resolve(
        &config,
        Overrides {
            profile: cli.profile,
            session_duration: cli.expires,
            region: cli.region,
        },
    )?;
    debug!(?settings, "Settings resolved");

    match cli.command {
        Commands::Init => commands::init(settings).await,
        Commands::Auth(args) => commands::auth(settings, args).await,
        Commands::Read(args) => commands::read(settings, args).await,
        Commands::Whoami => commands::whoami(settings).await,
    }
}
