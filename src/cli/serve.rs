//! `liftoff serve` - compile the app, then serve it over HTTP.

use crate::build::App;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::sync::Arc;

pub fn run(config: &Arc<AppConfig>) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // `launch` exits non-zero on build failure; on success the listener is up.
    let listening = rt.block_on(async { App::new(Arc::clone(config)).launch().await });

    // Block until Ctrl+C unblocks the listener and the request loop drains.
    listening.wait();
    Ok(())
}
