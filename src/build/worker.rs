//! Build worker protocol.
//!
//! A strict one-shot request/response exchange: the orchestrator submits one
//! `BuildRequest` and receives exactly one `BuildReply`. Two isolation
//! strategies implement the same trait, so call sites never branch:
//!
//! - `ProcessWorker` forks the current executable with the hidden `worker`
//!   subcommand and speaks line-delimited JSON over its stdio.
//! - `TaskWorker` runs the bundler on the blocking pool of the current
//!   runtime.
//!
//! The channel is single-use; anything a worker says after its first
//! completion message is ignored.

use crate::build::bundler::{Bundler, CommandBundler};
use crate::build::{BuildRequest, StatsReport};
use crate::cli::Cli;
use crate::config::AppConfig;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Single completion message sent back by a worker: the stats report, or the
/// reason compilation never produced one.
#[derive(Debug, Serialize, Deserialize)]
pub enum BuildReply {
    Stats(StatsReport),
    Error { message: String },
}

/// Submit a build request; the returned channel yields the single
/// completion message.
pub trait BuildWorker: Send + Sync {
    fn dispatch(&self, request: BuildRequest) -> oneshot::Receiver<BuildReply>;
}

// ============================================================================
// In-runtime worker
// ============================================================================

/// Runs the bundler on the blocking pool of the current tokio runtime.
pub struct TaskWorker {
    bundler: Arc<dyn Bundler>,
}

impl TaskWorker {
    pub fn new(bundler: Arc<dyn Bundler>) -> Self {
        Self { bundler }
    }
}

impl BuildWorker for TaskWorker {
    fn dispatch(&self, request: BuildRequest) -> oneshot::Receiver<BuildReply> {
        let (tx, rx) = oneshot::channel();
        let bundler = Arc::clone(&self.bundler);

        tokio::task::spawn_blocking(move || {
            let reply = match bundler.compile(&request) {
                Ok(stats) => BuildReply::Stats(stats),
                Err(e) => BuildReply::Error {
                    message: format!("{e:#}"),
                },
            };
            // The receiver may be gone after a timeout; nothing to do then.
            let _ = tx.send(reply);
        });

        rx
    }
}

// ============================================================================
// Forked worker
// ============================================================================

/// Forks the current executable as an isolated worker process.
pub struct ProcessWorker {
    config_path: PathBuf,
}

impl ProcessWorker {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }
}

impl BuildWorker for ProcessWorker {
    fn dispatch(&self, request: BuildRequest) -> oneshot::Receiver<BuildReply> {
        let (tx, rx) = oneshot::channel();
        let config_path = self.config_path.clone();

        tokio::task::spawn_blocking(move || {
            let reply = match run_forked(&config_path, &request) {
                Ok(reply) => reply,
                Err(e) => BuildReply::Error {
                    message: format!("{e:#}"),
                },
            };
            let _ = tx.send(reply);
        });

        rx
    }
}

/// Spawn the worker process, send the request, read the first reply line.
fn run_forked(config_path: &Path, request: &BuildRequest) -> Result<BuildReply> {
    let exe = std::env::current_exe().context("cannot locate the current executable")?;

    let mut child = Command::new(exe)
        .arg("--config")
        .arg(config_path)
        .arg("worker")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .context("failed to fork build worker")?;

    if let Some(mut stdin) = child.stdin.take() {
        let payload = serde_json::to_vec(request)?;
        stdin
            .write_all(&payload)
            .and_then(|()| stdin.write_all(b"\n"))
            .context("failed to send build request to worker")?;
    }

    let stdout = child.stdout.take().context("worker stdout unavailable")?;
    let reply = read_reply(&mut BufReader::new(stdout));

    // The exchange is over after the first message; reap the child.
    let _ = child.kill();
    let _ = child.wait();

    reply
}

/// Read the single completion message from a worker's output stream.
/// Everything after the first line is ignored.
fn read_reply<R: BufRead>(reader: &mut R) -> Result<BuildReply> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        bail!("worker closed its stream without replying");
    }
    serde_json::from_str(line.trim()).context("worker sent an unreadable completion message")
}

// ============================================================================
// Worker process entry point
// ============================================================================

/// Entry point for the hidden `worker` subcommand.
///
/// One request in, one reply out; compilation failures travel inside the
/// reply, so the process itself exits zero either way. Stdout belongs to the
/// protocol - nothing else in this process may write to it.
pub fn worker_main(cli: &'static Cli) -> Result<()> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read build request from stdin")?;

    let reply = match run_request(cli, &line) {
        Ok(stats) => BuildReply::Stats(stats),
        Err(e) => BuildReply::Error {
            message: format!("{e:#}"),
        },
    };

    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, &reply)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn run_request(cli: &'static Cli, line: &str) -> Result<StatsReport> {
    let request: BuildRequest =
        serde_json::from_str(line.trim()).context("unreadable build request on stdin")?;
    let config = AppConfig::load(cli)?;
    CommandBundler::from_config(&config).compile(&request)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildMode;
    use std::io::Cursor;

    struct FakeBundler(Result<StatsReport, String>);

    impl Bundler for FakeBundler {
        fn compile(&self, _request: &BuildRequest) -> Result<StatsReport> {
            match &self.0 {
                Ok(stats) => Ok(stats.clone()),
                Err(message) => bail!("{message}"),
            }
        }
    }

    fn request() -> BuildRequest {
        BuildRequest::new("dist".into(), BuildMode::Development, "root.tsx".into())
    }

    #[tokio::test]
    async fn test_task_worker_delivers_stats() {
        let stats = StatsReport {
            errors: vec!["warning turned fatal".to_string()],
            ..StatsReport::default()
        };
        let worker = TaskWorker::new(Arc::new(FakeBundler(Ok(stats))));

        let reply = worker.dispatch(request()).await.unwrap();
        let BuildReply::Stats(stats) = reply else {
            panic!("expected stats reply");
        };
        assert_eq!(stats.errors, vec!["warning turned fatal"]);
    }

    #[tokio::test]
    async fn test_task_worker_wraps_bundler_error() {
        let worker = TaskWorker::new(Arc::new(FakeBundler(Err("out of memory".to_string()))));

        let reply = worker.dispatch(request()).await.unwrap();
        let BuildReply::Error { message } = reply else {
            panic!("expected error reply");
        };
        assert!(message.contains("out of memory"));
    }

    #[test]
    fn test_read_reply_takes_first_message_only() {
        let first = serde_json::to_string(&BuildReply::Error {
            message: "first".to_string(),
        })
        .unwrap();
        let second = serde_json::to_string(&BuildReply::Error {
            message: "second".to_string(),
        })
        .unwrap();
        let mut stream = Cursor::new(format!("{first}\n{second}\n"));

        let BuildReply::Error { message } = read_reply(&mut stream).unwrap() else {
            panic!("expected error reply");
        };
        assert_eq!(message, "first");
    }

    #[test]
    fn test_read_reply_closed_stream() {
        let mut stream = Cursor::new(String::new());
        let err = read_reply(&mut stream).unwrap_err();
        assert!(format!("{err}").contains("without replying"));
    }

    #[test]
    fn test_read_reply_garbage() {
        let mut stream = Cursor::new("not json\n".to_string());
        assert!(read_reply(&mut stream).is_err());
    }
}
