//! Build orchestrator.
//!
//! Owns the whole lifecycle of one build: validate the configuration,
//! dispatch a request through the worker protocol, wait for the single
//! completion message, interpret it, and - on success - wire the compiled
//! renderer into the HTTP layer and start listening.
//!
//! The chunk index and renderer belong to the build that produced them; a
//! later successful build constructs fresh ones instead of mutating shared
//! state. One build per `App` may be in flight at a time; concurrent calls
//! are rejected outright.

use crate::build::bundler::{Bundler, CommandBundler};
use crate::build::worker::{BuildReply, BuildWorker, ProcessWorker, TaskWorker};
use crate::build::{BuildError, BuildRequest, StatsReport};
use crate::config::{AppConfig, WorkerIsolation};
use crate::render::{RenderEngine, RenderResolver};
use crate::server::{HttpServer, ListeningServer};
use crate::{chunk, debug, logger, utils};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Produces the render engine for a finished build. Swappable so tests can
/// avoid spawning a real renderer runtime.
pub type EngineLoader =
    Box<dyn Fn(&AppConfig) -> anyhow::Result<Box<dyn RenderEngine>> + Send + Sync>;

pub struct App {
    config: Arc<AppConfig>,
    bundler: Arc<dyn Bundler>,
    engine_loader: EngineLoader,
    silent: bool,
    in_flight: AtomicBool,
}

impl App {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let bundler: Arc<dyn Bundler> = Arc::new(CommandBundler::from_config(&config));
        Self {
            bundler,
            engine_loader: Box::new(crate::render::load_engine),
            silent: config.silent,
            in_flight: AtomicBool::new(false),
            config,
        }
    }

    /// Suppress status output. Errors still propagate to the caller.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Replace the compiler adapter (used with task isolation).
    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = bundler;
        self
    }

    /// Replace the renderer loader.
    pub fn with_engine_loader(mut self, loader: EngineLoader) -> Self {
        self.engine_loader = loader;
        self
    }

    // ------------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------------

    /// Compile both bundles, wire the renderer into the HTTP layer, and
    /// resolve with the listening server once the bind completes.
    pub async fn build(&self) -> Result<ListeningServer, BuildError> {
        let result = self.run_build().await;
        self.report(result)
    }

    /// Compile both bundles without starting a listener.
    pub async fn compile(&self) -> Result<StatsReport, BuildError> {
        let result = self.run_compile().await;
        self.report(result)
    }

    /// Build, exiting the process non-zero on failure. The failure line has
    /// already been written by `build()`; callers that want to handle errors
    /// programmatically use `build()` directly.
    pub async fn launch(&self) -> ListeningServer {
        match self.build().await {
            Ok(server) => server,
            Err(_) => std::process::exit(1),
        }
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    async fn run_build(&self) -> Result<ListeningServer, BuildError> {
        let _flight = self.acquire()?;
        let stats = self.compile_stats().await?;
        self.wire(stats)
    }

    async fn run_compile(&self) -> Result<StatsReport, BuildError> {
        let _flight = self.acquire()?;
        let stats = self.compile_stats().await?;
        self.status_ready("client and server bundles compiled");
        Ok(stats)
    }

    /// Validate, dispatch, and interpret the worker's completion message.
    async fn compile_stats(&self) -> Result<StatsReport, BuildError> {
        let entry = self.validate()?;
        let mode = self.config.effective_mode();

        self.status_start(&format!("building {} ({mode})", entry.display()));

        let request = BuildRequest::new(self.config.dist().to_path_buf(), mode, entry);
        let reply = self.await_reply(request).await?;
        self.interpret(reply)
    }

    /// Fail fast on configuration problems, before any compilation work.
    fn validate(&self) -> Result<PathBuf, BuildError> {
        let dist = self.config.dist();

        // A pre-existing dist path must be a writable directory. The check
        // races against the bundler writing later, but catches the common
        // misconfigurations up front.
        if dist.exists() {
            if !dist.is_dir() {
                return Err(BuildError::Config(format!(
                    "cannot overwrite non-directory {}",
                    dist.display()
                )));
            }
            if !utils::fs::dir_writable(dist) {
                return Err(BuildError::Config(format!(
                    "cannot write to dist path {}",
                    dist.display()
                )));
            }
        }

        let Some(entry) = self.config.entry() else {
            return Err(BuildError::Config(
                "no entry set: point `app.entry` (or --entry) at your root component".to_string(),
            ));
        };
        if !entry.is_file() {
            return Err(BuildError::Config(format!(
                "entry `{}` is not a valid file",
                entry.display()
            )));
        }
        if !utils::fs::file_readable(entry) {
            return Err(BuildError::Config(format!(
                "cannot read entry `{}`",
                entry.display()
            )));
        }

        Ok(entry.to_path_buf())
    }

    /// Dispatch through the configured worker and wait for its single
    /// completion message, bounded by the configured timeout.
    async fn await_reply(&self, request: BuildRequest) -> Result<BuildReply, BuildError> {
        let worker = self.worker();
        let rx = worker.dispatch(request);

        let received = match self.config.build.timeout {
            0 => rx.await,
            secs => match tokio::time::timeout(Duration::from_secs(secs), rx).await {
                Ok(received) => received,
                Err(_) => return Err(BuildError::Timeout(secs)),
            },
        };

        received.map_err(|_| BuildError::Worker("completion channel closed".to_string()))
    }

    fn worker(&self) -> Box<dyn BuildWorker> {
        match self.config.build.isolation {
            WorkerIsolation::Process => {
                Box::new(ProcessWorker::new(self.config.config_path.clone()))
            }
            WorkerIsolation::Task => Box::new(TaskWorker::new(Arc::clone(&self.bundler))),
        }
    }

    /// A hard error and a report with diagnostics both abort the build; they
    /// only differ in how they read.
    fn interpret(&self, reply: BuildReply) -> Result<StatsReport, BuildError> {
        match reply {
            BuildReply::Error { message } => Err(BuildError::Compile(message)),
            BuildReply::Stats(stats) if !stats.errors.is_empty() => Err(BuildError::Diagnostics {
                count: stats.errors.len(),
                text: stats.errors.join("\n"),
            }),
            BuildReply::Stats(stats) => Ok(stats),
        }
    }

    /// Success path: chunk index, renderer, catch-all route, listener.
    /// The listener only exists once everything before it is in place.
    fn wire(&self, stats: StatsReport) -> Result<ListeningServer, BuildError> {
        let index = chunk::build_index(&stats.client, &stats.server)
            .map_err(|e| BuildError::Compile(format!("{e:#}")))?;
        debug!("build"; "chunk index covers {} server module(s)", index.len());

        let engine = (self.engine_loader)(&self.config)
            .map_err(|e| BuildError::Renderer(format!("{e:#}")))?;
        let resolver = RenderResolver::new(index, engine);

        let http = HttpServer::bind(&self.config)
            .map_err(|e| BuildError::Server(format!("{e:#}")))?;
        let listening = http.serve(resolver);

        self.status_ready(&format!("app ready on http://{}", listening.addr()));
        Ok(listening)
    }

    // ------------------------------------------------------------------------
    // Single-flight guard
    // ------------------------------------------------------------------------

    fn acquire(&self) -> Result<FlightGuard<'_>, BuildError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BuildError::InFlight);
        }
        Ok(FlightGuard(&self.in_flight))
    }

    // ------------------------------------------------------------------------
    // Status output (cosmetic; errors always propagate)
    // ------------------------------------------------------------------------

    fn report<T>(&self, result: Result<T, BuildError>) -> Result<T, BuildError> {
        if let Err(e) = &result {
            self.status_fail(&format!("error: {e}"));
        }
        result
    }

    fn status_start(&self, message: &str) {
        if !self.silent {
            logger::status_start(message);
        }
    }

    fn status_ready(&self, message: &str) {
        if !self.silent {
            logger::status_ready(message);
        }
    }

    fn status_fail(&self, message: &str) {
        if !self.silent {
            logger::status_fail(message);
        }
    }
}

/// Releases the in-flight flag when a build finishes, however it finishes.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::stats::{ChunkStat, CompilationStats};
    use crate::chunk::MAIN_ENTRY;
    use crate::config::{AppSection, BuildSection, ServeSection};
    use crate::core::BuildMode;
    use crate::render::{RenderOutcome, SERVER_ARTIFACT};
    use anyhow::bail;
    use std::path::Path;

    // ------------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------------

    struct FakeBundler {
        result: Result<StatsReport, String>,
        called: AtomicBool,
        delay: Duration,
        emit_artifact: bool,
    }

    impl FakeBundler {
        fn ok(report: StatsReport) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(report),
                called: AtomicBool::new(false),
                delay: Duration::ZERO,
                emit_artifact: true,
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Err(message.to_string()),
                called: AtomicBool::new(false),
                delay: Duration::ZERO,
                emit_artifact: false,
            })
        }

        fn slow(report: StatsReport, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(report),
                called: AtomicBool::new(false),
                delay,
                emit_artifact: true,
            })
        }

        fn was_called(&self) -> bool {
            self.called.load(Ordering::SeqCst)
        }
    }

    impl Bundler for FakeBundler {
        fn compile(&self, request: &BuildRequest) -> anyhow::Result<StatsReport> {
            self.called.store(true, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            if self.emit_artifact {
                std::fs::create_dir_all(&request.dist)?;
                std::fs::write(request.dist.join(SERVER_ARTIFACT), "// compiled renderer")?;
            }
            match &self.result {
                Ok(report) => Ok(report.clone()),
                Err(message) => bail!("{message}"),
            }
        }
    }

    struct NullEngine;

    impl RenderEngine for NullEngine {
        fn render(&self, _url: &str) -> anyhow::Result<RenderOutcome> {
            Ok(RenderOutcome::default())
        }
    }

    fn good_report() -> StatsReport {
        let mut client = CompilationStats {
            chunks: vec![ChunkStat {
                id: 0,
                files: vec!["main.js".to_string()],
                module_identifiers: Vec::new(),
            }],
            ..CompilationStats::default()
        };
        client
            .assets_by_entry
            .insert(MAIN_ENTRY.to_string(), vec!["main.js".to_string()]);
        StatsReport {
            errors: Vec::new(),
            client,
            server: CompilationStats::default(),
        }
    }

    fn report_with_errors() -> StatsReport {
        StatsReport {
            errors: vec![
                "Module not found: ./missing".to_string(),
                "Unexpected token".to_string(),
            ],
            ..good_report()
        }
    }

    fn test_config(root: &Path, entry: Option<PathBuf>, dist: PathBuf) -> Arc<AppConfig> {
        Arc::new(AppConfig {
            root: root.to_path_buf(),
            config_path: root.join("liftoff.toml"),
            app: AppSection {
                entry,
                dist,
                mode: Some(BuildMode::Production),
            },
            build: BuildSection {
                isolation: WorkerIsolation::Task,
                bundler: Vec::new(),
                timeout: 5,
            },
            serve: ServeSection {
                port: 0,
                ..ServeSection::default()
            },
            ..AppConfig::default()
        })
    }

    fn write_entry(root: &Path) -> PathBuf {
        let entry = root.join("root.tsx");
        std::fs::write(&entry, "export default () => null;").unwrap();
        entry
    }

    fn test_app(config: Arc<AppConfig>, bundler: Arc<FakeBundler>) -> App {
        App::new(config)
            .silent()
            .with_bundler(bundler)
            .with_engine_loader(Box::new(|_| Ok(Box::new(NullEngine))))
    }

    // ------------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_build_resolves_and_emits_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path());
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();

        let bundler = FakeBundler::ok(good_report());
        let app = test_app(test_config(dir.path(), Some(entry), dist.clone()), bundler);

        let server = app.build().await.unwrap();
        assert!(dist.join(SERVER_ARTIFACT).is_file());
        server.close();
    }

    #[tokio::test]
    async fn test_missing_entry_rejects_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let bundler = FakeBundler::ok(good_report());
        let app = test_app(
            test_config(dir.path(), None, dir.path().join("dist")),
            Arc::clone(&bundler),
        );

        let err = app.build().await.unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert!(err.to_string().contains("no entry set"));
        assert!(!bundler.was_called());
    }

    #[tokio::test]
    async fn test_nonexistent_entry_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let bundler = FakeBundler::ok(good_report());
        let app = test_app(
            test_config(
                dir.path(),
                Some(dir.path().join("ghost.tsx")),
                dir.path().join("dist"),
            ),
            Arc::clone(&bundler),
        );

        let err = app.build().await.unwrap_err();
        assert!(err.to_string().contains("not a valid file"));
        assert!(!bundler.was_called());
    }

    #[tokio::test]
    async fn test_non_directory_dist_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path());
        let dist = dir.path().join("dist");
        std::fs::write(&dist, "I am a file").unwrap();

        let bundler = FakeBundler::ok(good_report());
        let app = test_app(
            test_config(dir.path(), Some(entry), dist),
            Arc::clone(&bundler),
        );

        let err = app.build().await.unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert!(err.to_string().contains("non-directory"));
        assert!(!bundler.was_called());
    }

    #[tokio::test]
    async fn test_diagnostics_block_listener() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path());

        let engine_loaded = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&engine_loaded);

        let app = App::new(test_config(dir.path(), Some(entry), dir.path().join("dist")))
            .silent()
            .with_bundler(FakeBundler::ok(report_with_errors()))
            .with_engine_loader(Box::new(move |_| {
                flag.store(true, Ordering::SeqCst);
                Ok(Box::new(NullEngine))
            }));

        let err = app.build().await.unwrap_err();
        let BuildError::Diagnostics { count, text } = err else {
            panic!("expected diagnostics, got {err}");
        };
        assert_eq!(count, 2);
        assert!(text.contains("Module not found"));

        // Aborted before wiring: no renderer, no listener.
        assert!(!engine_loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_bundler_failure_is_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path());

        let bundler = FakeBundler::failing("loader crashed");
        let app = test_app(
            test_config(dir.path(), Some(entry), dir.path().join("dist")),
            bundler,
        );

        let err = app.build().await.unwrap_err();
        let BuildError::Compile(message) = err else {
            panic!("expected compile error, got {err}");
        };
        assert!(message.contains("loader crashed"));
    }

    #[tokio::test]
    async fn test_worker_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path());

        let mut config = (*test_config(dir.path(), Some(entry), dir.path().join("dist"))).clone();
        config.build.timeout = 1;
        let bundler = FakeBundler::slow(good_report(), Duration::from_millis(1500));
        let app = test_app(Arc::new(config), bundler);

        let err = app.compile().await.unwrap_err();
        assert!(matches!(err, BuildError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_second_build_rejected_while_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path());

        let bundler = FakeBundler::slow(good_report(), Duration::from_millis(500));
        let app = Arc::new(test_app(
            test_config(dir.path(), Some(entry), dir.path().join("dist")),
            bundler,
        ));

        let first = {
            let app = Arc::clone(&app);
            tokio::spawn(async move { app.compile().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = app.compile().await.unwrap_err();
        assert!(matches!(err, BuildError::InFlight));

        // The original build is unaffected and completes.
        assert!(first.await.unwrap().is_ok());

        // Once it resolves, the app accepts work again.
        assert!(app.compile().await.is_ok());
    }
}
