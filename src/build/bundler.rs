//! Compiler adapter - drives the external bundler.
//!
//! The bundler is a black box: it consumes one serialized build request on
//! stdin and prints a stats report as JSON on stdout. A non-zero exit or
//! unreadable output is a hard compile error, distinct from a report that
//! parses but carries diagnostics.

use crate::build::{BuildRequest, StatsReport};
use crate::debug;
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Runs the client + server compilations for one build request.
pub trait Bundler: Send + Sync {
    fn compile(&self, request: &BuildRequest) -> Result<StatsReport>;
}

/// Default adapter: shells out to the configured bundler command.
pub struct CommandBundler {
    command: Vec<String>,
    cwd: PathBuf,
}

impl CommandBundler {
    pub fn new(command: Vec<String>, cwd: PathBuf) -> Self {
        Self { command, cwd }
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(config.build.bundler.clone(), config.root.clone())
    }
}

impl Bundler for CommandBundler {
    fn compile(&self, request: &BuildRequest) -> Result<StatsReport> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("no bundler command configured; set `[build] bundler` in liftoff.toml");
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn bundler `{program}`"))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(request)?;
            stdin
                .write_all(&payload)
                .and_then(|()| stdin.write_all(b"\n"))
                .with_context(|| format!("failed to send build request to `{program}`"))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for bundler `{program}`"))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            bail!(
                "bundler `{program}` failed with {}\n{}",
                output.status,
                stderr.trim()
            );
        }
        if !stderr.trim().is_empty() {
            debug!("bundler"; "{}", stderr.trim());
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("bundler `{program}` produced an unreadable stats report"))
    }
}
