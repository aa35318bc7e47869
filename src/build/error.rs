//! Build error taxonomy.

use thiserror::Error;

/// Everything that can go wrong between a `build()` call and a listening
/// server. Configuration problems are caught before any compilation is
/// dispatched; everything else maps to one phase of the pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid configuration, detected synchronously before dispatch.
    #[error("configuration error: {0}")]
    Config(String),

    /// The bundler failed outright: spawn failure, crash, or unreadable
    /// output.
    #[error("build error: {0}")]
    Compile(String),

    /// Compilation finished but reported fatal diagnostics.
    #[error("bundler reported {count} error(s):\n{text}")]
    Diagnostics { count: usize, text: String },

    /// The worker did not reply within the configured timeout.
    #[error("build timed out after {0}s waiting for the worker")]
    Timeout(u64),

    /// The worker channel closed without a completion message.
    #[error("build worker terminated without replying: {0}")]
    Worker(String),

    /// A second build was requested while one is still in flight.
    #[error("a build is already in flight for this app")]
    InFlight,

    /// The compiled server renderer could not be loaded.
    #[error("failed to load server renderer: {0}")]
    Renderer(String),

    /// The HTTP listener could not be created.
    #[error("failed to start server: {0}")]
    Server(String),
}
