//! Per-request render resolution.
//!
//! One resolver is built per successful build; it owns that build's chunk
//! index and render engine, and turns URLs into finished responses.

use crate::chunk::ChunkIndex;
use crate::render::document::{DocumentVars, render_document};
use crate::render::{RenderEngine, RenderOutcome};
use anyhow::Result;
use std::sync::Arc;

/// Outcome of resolving one request.
#[derive(Debug, PartialEq, Eq)]
pub enum Rendered {
    /// 301 or 302 with a Location header; no body.
    Redirect { status: u16, location: String },
    /// 404 with the standard body.
    NotFound,
    /// Full HTML document.
    Page { html: String },
}

pub struct RenderResolver {
    index: Arc<ChunkIndex>,
    engine: Box<dyn RenderEngine>,
}

impl RenderResolver {
    pub fn new(index: ChunkIndex, engine: Box<dyn RenderEngine>) -> Self {
        Self {
            index: Arc::new(index),
            engine,
        }
    }

    /// Render one request.
    ///
    /// Engine failures are not caught here; they propagate to the HTTP
    /// layer's generic error handler.
    pub fn resolve(&self, url: &str) -> Result<Rendered> {
        let outcome = self.engine.render(url)?;

        // 301 = permanent redirect, 302 = temporary. Redirects win over
        // whatever html or modules the render produced.
        if let Some(status @ (301 | 302)) = outcome.redirect_status {
            return Ok(Rendered::Redirect {
                status,
                location: outcome.redirect_url.unwrap_or_default(),
            });
        }

        if outcome.not_found {
            return Ok(Rendered::NotFound);
        }

        Ok(Rendered::Page {
            html: self.assemble(&outcome),
        })
    }

    fn assemble(&self, outcome: &RenderOutcome) -> String {
        let scripts = self.index.scripts_for(&outcome.used_modules);
        let styles = self.index.styles_for(&outcome.used_modules);

        render_document(&DocumentVars {
            head: outcome.head.as_deref().unwrap_or(""),
            body: &outcome.html,
            scripts: &scripts,
            styles: &styles,
            globals: &outcome.globals,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
