//! Serialized build request.

use crate::core::BuildMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a worker needs to run one build: where to put the output,
/// which mode to compile for, and the root component to start from.
///
/// Crosses the process boundary as a single JSON document and is never
/// mutated after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Distribution directory for compiled bundles.
    pub dist: PathBuf,
    /// Compilation mode for both bundles.
    pub mode: BuildMode,
    /// Root component entry file.
    pub entry: PathBuf,
}

impl BuildRequest {
    pub fn new(dist: PathBuf, mode: BuildMode, entry: PathBuf) -> Self {
        Self { dist, mode, entry }
    }
}
