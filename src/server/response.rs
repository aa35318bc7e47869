//! HTTP response helpers.

use crate::config::ServeSection;
use crate::utils::mime;
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tiny_http::{Header, Request, Response, StatusCode};

/// Per-request response builder carrying the middleware decorations
/// (CORS, timing) every response gets.
pub struct Respond {
    cors: bool,
    started: Option<Instant>,
}

impl Respond {
    pub fn new(serve: &ServeSection) -> Self {
        Self {
            cors: serve.cors,
            started: serve.timing.then(Instant::now),
        }
    }

    /// Serve a file from disk with its detected content type.
    pub fn file(self, request: Request, path: &Path) -> Result<()> {
        let content_type = mime::from_path(path);
        let body =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        self.send(request, 200, content_type, body)
    }

    pub fn html(self, request: Request, status: u16, body: String) -> Result<()> {
        self.send(request, status, mime::types::HTML, body.into_bytes())
    }

    pub fn text(self, request: Request, status: u16, body: &str) -> Result<()> {
        self.send(request, status, mime::types::PLAIN, body.as_bytes().to_vec())
    }

    /// Status-only response (favicon 204 and friends).
    pub fn empty(self, request: Request, status: u16) -> Result<()> {
        let response = self.decorate(Response::empty(StatusCode(status)));
        request.respond(response).map_err(Into::into)
    }

    /// Redirect with a Location header and no body.
    pub fn redirect(self, request: Request, status: u16, location: &str) -> Result<()> {
        let location = Header::from_bytes("Location", location.as_bytes())
            .map_err(|()| anyhow!("invalid redirect location"))?;
        let response = self
            .decorate(Response::empty(StatusCode(status)))
            .with_header(location);
        request.respond(response).map_err(Into::into)
    }

    fn send(
        self,
        request: Request,
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> Result<()> {
        let response = self
            .decorate(Response::from_data(body))
            .with_status_code(StatusCode(status))
            .with_header(make_header("Content-Type", content_type));
        request.respond(response).map_err(Into::into)
    }

    fn decorate<R: std::io::Read>(&self, mut response: Response<R>) -> Response<R> {
        if self.cors {
            response = response.with_header(make_header("Access-Control-Allow-Origin", "*"));
        }
        if let Some(started) = self.started {
            let value = format_timing(started.elapsed());
            if let Ok(header) = Header::from_bytes("Response-Time", value.as_bytes()) {
                response = response.with_header(header);
            }
        }
        response
    }
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}

/// Milliseconds with microsecond precision, e.g. `1.532ms`.
fn format_timing(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1e3)
}
