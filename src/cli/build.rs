//! `liftoff build` - compile the bundles without serving.

use crate::build::App;
use crate::config::AppConfig;
use crate::log;
use anyhow::{Context, Result};
use std::sync::Arc;

pub fn run(config: &Arc<AppConfig>) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async {
        let app = App::new(Arc::clone(config));
        match app.compile().await {
            Ok(report) => {
                log!(
                    "build";
                    "{} client chunk(s), {} server module(s) -> {}",
                    report.client.chunks.len(),
                    report.server.modules.len(),
                    config.dist().display()
                );
                Ok(())
            }
            // The failure line is already on screen; mirror `launch()` and
            // exit non-zero for CI use.
            Err(_) => std::process::exit(1),
        }
    })
}
