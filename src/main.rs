//! edgeship - deployment plan compiler for server-rendered sites.

mod cli;
mod config;
mod embed;
mod error;
mod layout;
mod logger;
mod plan;
mod provision;
mod sync;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    sync::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = SiteConfig::load(&cli)?;

    match &cli.command {
        Commands::Plan { json, .. } => cli::plan::print_plan(&config, *json),
        Commands::Check { .. } => cli::check::check_site(&config),
        Commands::Deploy { dry_run, .. } => cli::deploy::deploy_site(&config, *dry_run),
    }
}
