//! Liftoff - compile a server-rendered web app and serve it.

#![allow(dead_code)]

mod build;
mod chunk;
mod cli;
mod config;
mod core;
mod logger;
mod render;
mod server;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{AppConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    // The forked worker speaks JSON on stdout; nothing else may write there,
    // so it runs before any config logging.
    if cli.is_worker() {
        return build::worker_main(cli);
    }

    let config = init_config(AppConfig::load(cli)?);

    match &cli.command {
        Commands::Build { .. } => cli::build::run(&config),
        Commands::Serve { .. } => cli::serve::run(&config),
        Commands::Worker => unreachable!("handled above"),
    }
}
