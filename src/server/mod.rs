//! HTTP layer - binds the listener and runs the request loop.
//!
//! Middleware order mirrors what the request path needs: shutdown guard,
//! `/ping`, favicon, static assets from `<dist>/public`, then the catch-all
//! render resolver. A failed render answers 500 and never takes the
//! listener down.

mod response;

use crate::config::AppConfig;
use crate::log;
use crate::render::{RenderResolver, Rendered};
use anyhow::{Result, anyhow};
use response::Respond;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Request, Server};

/// Bound listener, not yet accepting requests.
pub struct HttpServer {
    server: Arc<Server>,
    addr: SocketAddr,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Bind the configured interface and port.
    pub fn bind(config: &Arc<AppConfig>) -> Result<Self> {
        let requested = SocketAddr::new(config.serve.interface, config.serve.port);
        let server = Server::http(requested)
            .map_err(|e| anyhow!("failed to bind {requested}: {e}"))?;

        // Resolve the actual address (port 0 binds ephemerally).
        let addr = server.server_addr().to_ip().unwrap_or(requested);

        Ok(Self {
            server: Arc::new(server),
            addr,
            config: Arc::clone(config),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register the catch-all renderer and start the request loop.
    pub fn serve(self, resolver: RenderResolver) -> ListeningServer {
        crate::core::register_server(Arc::clone(&self.server));

        let server = Arc::clone(&self.server);
        let config = Arc::clone(&self.config);
        let resolver = Arc::new(resolver);
        let handle = thread::spawn(move || run_loop(&server, &config, &resolver));

        ListeningServer {
            addr: self.addr,
            server: self.server,
            handle,
        }
    }
}

/// Handle to a running server.
pub struct ListeningServer {
    addr: SocketAddr,
    server: Arc<Server>,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for ListeningServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListeningServer")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl ListeningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and join the loop.
    pub fn close(self) {
        self.server.unblock();
        let _ = self.handle.join();
    }

    /// Block until the loop ends (Ctrl+C unblocks the listener).
    pub fn wait(self) {
        let _ = self.handle.join();
    }
}

// ============================================================================
// Request loop
// ============================================================================

fn run_loop(server: &Server, config: &Arc<AppConfig>, resolver: &Arc<RenderResolver>) {
    // Thread pool keeps one slow render from blocking other requests.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to create request pool");

    for request in server.incoming_requests() {
        let config = Arc::clone(config);
        let resolver = Arc::clone(resolver);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &config, &resolver) {
                log!("serve"; "request error: {e:#}");
            }
        });
    }
}

/// Handle a single HTTP request.
fn handle_request(
    request: Request,
    config: &AppConfig,
    resolver: &RenderResolver,
) -> Result<()> {
    let respond = Respond::new(&config.serve);

    if crate::core::is_shutdown() {
        return respond.text(request, 503, "503 Service Unavailable");
    }

    let url = request.url().to_string();
    let path = request_path(&url);

    if config.serve.ping && path == "/ping" {
        return respond.text(request, 200, "pong");
    }

    let public = config.public_dir();

    if path == "/favicon.ico" && config.serve.favicon {
        let icon = public.join("favicon.ico");
        if icon.is_file() {
            return respond.file(request, &icon);
        }
        return respond.empty(request, 204);
    }

    // Static assets win over the renderer for non-root paths.
    if path != "/"
        && let Some(file) = resolve_static(&public, path)
    {
        return respond.file(request, &file);
    }

    match resolver.resolve(&url) {
        Ok(Rendered::Redirect { status, location }) => respond.redirect(request, status, &location),
        Ok(Rendered::NotFound) => respond.text(request, 404, "Not found"),
        Ok(Rendered::Page { html }) => respond.html(request, 200, html),
        Err(e) => {
            // Request-time failures never crash the listener.
            log!("error"; "render failed for {url}: {e:#}");
            respond.text(request, 500, "There was an error. Please try again later.")
        }
    }
}

/// URL path without query string or fragment.
fn request_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or("/")
}

/// Resolve a URL path against the public asset directory, refusing anything
/// that would escape it.
fn resolve_static(public: &Path, path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let relative = Path::new(trimmed);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let full = public.join(relative);
    full.is_file().then_some(full)
}

// ============================================================================
// Tests
// ============================================================================
