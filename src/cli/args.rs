//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Compile server-rendered sites into CDN deployment plans
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, global = true, default_value = "edgeship.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print debug output from every stage
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build and validate the deployment plan, then print it
    #[command(visible_alias = "p")]
    Plan {
        #[command(flatten)]
        mode: ModeArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the plan and report every problem found
    #[command(visible_alias = "c")]
    Check {
        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Provision the plan, upload assets and invalidate the CDN
    #[command(visible_alias = "d")]
    Deploy {
        #[command(flatten)]
        mode: ModeArgs,

        /// Run against the in-memory engine, touching no cloud resources
        #[arg(long)]
        dry_run: bool,

        /// Do not wait for the invalidation to complete
        #[arg(long)]
        no_wait: bool,
    },
}

/// Flags overriding `[site]` for one run.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ModeArgs {
    /// Use the placeholder site instead of the build output
    #[arg(long)]
    pub dev: bool,

    /// Render at edge locations
    #[arg(long)]
    pub edge: bool,
}
