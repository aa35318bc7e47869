//! Application configuration management for `liftoff.toml`.
//!
//! # Sections
//!
//! | Section   | Purpose                                            |
//! |-----------|----------------------------------------------------|
//! | `[app]`   | Entry file, distribution directory, build mode     |
//! | `[build]` | Worker isolation, bundler command, timeout         |
//! | `[serve]` | HTTP interface/port, renderer runtime, middleware  |
//!
//! CLI arguments override the file; paths are `~`-expanded and resolved
//! relative to the project root (the config file's parent directory).

mod error;
mod handle;

pub use error::ConfigError;
pub use handle::{cfg, init_config};

use crate::cli::{Cli, Commands};
use crate::core::BuildMode;
use crate::log;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing liftoff.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// CLI arguments reference (internal use only)
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Suppress status output (internal use only)
    #[serde(skip)]
    pub silent: bool,

    /// App settings (entry, dist, mode)
    #[serde(default)]
    pub app: AppSection,

    /// Build settings (worker isolation, bundler command, timeout)
    #[serde(default)]
    pub build: BuildSection,

    /// Server settings (interface, port, renderer runtime, middleware)
    #[serde(default)]
    pub serve: ServeSection,
}

/// `[app]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Root component entry file, relative to the project root.
    pub entry: Option<PathBuf>,

    /// Distribution directory for compiled bundles.
    pub dist: PathBuf,

    /// Build mode; falls back to `NODE_ENV` when unset.
    pub mode: Option<BuildMode>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            entry: None,
            dist: PathBuf::from("dist"),
            mode: None,
        }
    }
}

/// Worker isolation strategy for the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkerIsolation {
    /// Fork the current executable as a separate worker process.
    #[default]
    Process,
    /// Run the bundler as a task on the orchestrator's own runtime.
    Task,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Where the bundler runs: a forked process or an in-runtime task.
    pub isolation: WorkerIsolation,

    /// External bundler command. Receives the serialized build request on
    /// stdin and must print a stats report as JSON on stdout.
    pub bundler: Vec<String>,

    /// Seconds to wait for the worker's completion message (0 = no limit).
    pub timeout: u64,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            isolation: WorkerIsolation::default(),
            bundler: Vec::new(),
            timeout: 600,
        }
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeSection {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Command that runs the compiled server renderer (cwd = dist).
    pub runtime: Vec<String>,

    /// Answer cross-origin requests with a permissive CORS header.
    pub cors: bool,

    /// Answer `/ping` with `pong`.
    pub ping: bool,

    /// Answer `/favicon.ico` with 204 when no icon asset exists.
    pub favicon: bool,

    /// Attach a `Response-Time` header to every response.
    pub timing: bool,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            runtime: vec!["node".to_string(), "server.js".to_string()],
            cors: false,
            ping: true,
            favicon: true,
            timing: true,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file; the project root is
    /// the config file's parent directory.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let Some(config_path) = find_config_file(&cli.config) else {
            log!(
                "error";
                "Config file '{}' not found. Create a liftoff.toml in your project root.",
                cli.config.display()
            );
            std::process::exit(1);
        };

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::Io(config_path.clone(), e))?;
        let mut config = Self::from_toml_str(&content)?;

        config.root = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        config.config_path = config_path;
        config.cli = Some(cli);
        config.apply_cli(cli);
        config.normalize_paths();

        Ok(config)
    }

    /// Parse a config from TOML text (no CLI merging, no path resolution).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Merge CLI overrides into the file-based configuration.
    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(entry) = &cli.entry {
            self.app.entry = Some(entry.clone());
        }
        if let Some(dist) = &cli.dist {
            self.app.dist = dist.clone();
        }

        if let Some(args) = cli.build_args() {
            if let Some(mode) = args.mode {
                self.app.mode = Some(mode);
            }
            if args.no_fork {
                self.build.isolation = WorkerIsolation::Task;
            }
            self.silent = args.silent;
            crate::logger::set_verbose(args.verbose);
        }

        if let Commands::Serve { interface, port, .. } = &cli.command {
            if let Some(interface) = interface {
                self.serve.interface = *interface;
            }
            if let Some(port) = port {
                self.serve.port = *port;
            }
        }

        if self.silent {
            crate::logger::set_silent(true);
        }
    }

    /// Expand `~` and anchor user paths at the project root.
    fn normalize_paths(&mut self) {
        self.app.dist = self.resolve(&self.app.dist.clone());
        if let Some(entry) = self.app.entry.clone() {
            self.app.entry = Some(self.resolve(&entry));
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        if expanded.is_absolute() {
            expanded
        } else {
            crate::utils::fs::normalize_path(&self.root.join(expanded))
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Distribution directory (absolute after `load`).
    pub fn dist(&self) -> &Path {
        &self.app.dist
    }

    /// Entry file, if one is configured.
    pub fn entry(&self) -> Option<&Path> {
        self.app.entry.as_deref()
    }

    /// Configured mode, or the environment default.
    pub fn effective_mode(&self) -> BuildMode {
        self.app.mode.unwrap_or_else(BuildMode::from_env)
    }

    /// Directory of client assets served as static files.
    pub fn public_dir(&self) -> PathBuf {
        self.app.dist.join("public")
    }
}

/// Walk upward from cwd looking for the config file.
fn find_config_file(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(path);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
