//! Command-line interface definitions.

use crate::core::BuildMode;
use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Liftoff server-rendered app builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: liftoff.toml)
    #[arg(short = 'C', long, global = true, default_value = "liftoff.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Root component entry file (overrides app.entry)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub entry: Option<PathBuf>,

    /// Distribution directory (overrides app.dist)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub dist: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile the client and server bundles without serving
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Compile the app, then serve it over HTTP
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Isolated build worker: reads one build request on stdin, writes one
    /// completion message on stdout
    #[command(hide = true)]
    Worker,
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build mode (development, production); defaults to NODE_ENV
    #[arg(short, long, value_enum)]
    pub mode: Option<BuildMode>,

    /// Run the bundler in-process instead of forking a worker
    #[arg(long)]
    pub no_fork: bool,

    /// Suppress status output
    #[arg(short, long)]
    pub silent: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_worker(&self) -> bool {
        matches!(self.command, Commands::Worker)
    }

    /// Build arguments, for the commands that carry them.
    pub const fn build_args(&self) -> Option<&BuildArgs> {
        match &self.command {
            Commands::Build { build_args } | Commands::Serve { build_args, .. } => Some(build_args),
            Commands::Worker => None,
        }
    }
}
