//! # tr-cli
//!
//! Command-line interface for Typo Reporter.
//!
//! - `tr typo report/list/show/patch/delete/counts/last` — report typos and
//!   drive them through their lifecycle within a workspace
//! - `tr token show/provision/regenerate/verify` — manage the workspace API
//!   access token used by external integrations
//!
//! Configuration lives in `.tr/config.toml` under the project root.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::ReporterConfig;

/// Typo Reporter CLI — collect and triage reported typos.
#[derive(Parser)]
#[command(name = "tr", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report and manage typos.
    Typo {
        #[command(subcommand)]
        command: commands::typo::TypoCommands,
    },
    /// Manage workspace API access tokens.
    Token {
        #[command(subcommand)]
        command: commands::token::TokenCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for --json output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tr_typo=info".parse()?)
                .add_directive("tr_workspace=info".parse()?)
                .add_directive("tr_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = ReporterConfig::for_project(&project_root)?;

    match &cli.command {
        Commands::Typo { command } => commands::typo::execute(command, &config, cli.json),
        Commands::Token { command } => commands::token::execute(command, &config, cli.json),
    }
}
