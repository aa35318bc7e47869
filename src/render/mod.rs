//! Render engine boundary and per-request resolution.
//!
//! The render engine is the compiled server bundle - a black box that turns
//! a URL into HTML plus the module ids the render touched. The default
//! engine starts the artifact once as a long-lived child process and speaks
//! one JSON line per render; tests substitute in-process fakes.

mod document;
mod resolver;

pub use document::{DocumentVars, render_document};
pub use resolver::{Rendered, RenderResolver};

use crate::build::ModuleId;
use crate::config::AppConfig;
use anyhow::{Context, Result, bail};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Relative path of the compiled server renderer inside the dist directory.
pub const SERVER_ARTIFACT: &str = "server.js";

/// Result of one server render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOutcome {
    /// Rendered fragment for the application root.
    pub html: String,
    /// Ids of the server modules touched during this render.
    pub used_modules: Vec<ModuleId>,
    /// 301 or 302 when the route resolved to a redirect.
    pub redirect_status: Option<u16>,
    pub redirect_url: Option<String>,
    /// The route matched nothing.
    pub not_found: bool,
    /// Pre-rendered head markup (title, meta) captured during the render.
    pub head: Option<String>,
    /// Values serialized onto `window.*` for client hydration.
    pub globals: serde_json::Map<String, serde_json::Value>,
}

/// Renders one URL; called once per incoming request.
pub trait RenderEngine: Send + Sync {
    fn render(&self, url: &str) -> Result<RenderOutcome>;
}

/// Load the compiled renderer for a finished build.
///
/// The artifact must exist on disk before the listener starts; it is loaded
/// exactly once per build.
pub fn load_engine(config: &AppConfig) -> Result<Box<dyn RenderEngine>> {
    let artifact = config.dist().join(SERVER_ARTIFACT);
    if !artifact.is_file() {
        bail!(
            "server renderer artifact `{}` not found; the bundler did not emit it",
            artifact.display()
        );
    }
    Ok(Box::new(SubprocessEngine::spawn(
        &config.serve.runtime,
        config.dist(),
    )?))
}

// ============================================================================
// Subprocess engine
// ============================================================================

/// Runs the compiled server bundle in a child process. Each render is one
/// request line on stdin and one outcome line on stdout; the mutex keeps the
/// exchange per-request exclusive.
pub struct SubprocessEngine {
    io: Mutex<EngineIo>,
}

struct EngineIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl SubprocessEngine {
    pub fn spawn(command: &[String], dist: &Path) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("no renderer runtime configured; set `[serve] runtime`")?;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(dist)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start renderer runtime `{program}`"))?;

        let stdin = child.stdin.take().context("renderer stdin unavailable")?;
        let stdout = child.stdout.take().context("renderer stdout unavailable")?;

        Ok(Self {
            io: Mutex::new(EngineIo {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
        })
    }
}

impl RenderEngine for SubprocessEngine {
    fn render(&self, url: &str) -> Result<RenderOutcome> {
        let mut io = self.io.lock();

        let request = serde_json::json!({ "url": url });
        serde_json::to_writer(&mut io.stdin, &request)?;
        io.stdin.write_all(b"\n")?;
        io.stdin.flush()?;

        let mut line = String::new();
        if io.stdout.read_line(&mut line)? == 0 {
            bail!("renderer process closed its stream");
        }
        serde_json::from_str(line.trim()).context("renderer sent an unreadable response")
    }
}

impl Drop for SubprocessEngine {
    fn drop(&mut self) {
        let io = self.io.get_mut();
        let _ = io.child.kill();
        let _ = io.child.wait();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_defaults() {
        let outcome: RenderOutcome = serde_json::from_str("{}").unwrap();
        assert!(outcome.html.is_empty());
        assert!(outcome.used_modules.is_empty());
        assert!(outcome.redirect_status.is_none());
        assert!(!outcome.not_found);
    }

    #[test]
    fn test_outcome_parse() {
        let outcome: RenderOutcome = serde_json::from_str(
            r#"{"html":"<p>hi</p>","used_modules":[3,"./About"],"head":"<title>Hi</title>"}"#,
        )
        .unwrap();
        assert_eq!(outcome.html, "<p>hi</p>");
        assert_eq!(outcome.used_modules.len(), 2);
        assert_eq!(outcome.head.as_deref(), Some("<title>Hi</title>"));
    }

    #[test]
    fn test_subprocess_engine_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"while read line; do echo '{"html":"<p>ok</p>","used_modules":[1]}'; done"#
                .to_string(),
        ];

        let engine = SubprocessEngine::spawn(&command, dir.path()).unwrap();
        let outcome = engine.render("/about").unwrap();
        assert_eq!(outcome.html, "<p>ok</p>");

        // Subsequent renders reuse the same process.
        let outcome = engine.render("/").unwrap();
        assert_eq!(outcome.used_modules, vec![ModuleId::Num(1)]);
    }
}
