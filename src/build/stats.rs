//! Compilation stats report types.
//!
//! The bundler runs two compilations (client, server) and reports both in a
//! single `StatsReport`. Module ids are assigned independently per
//! compilation; only the `identifier` string is comparable across the two.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Module id within one compilation. Bundlers use numbers in production
/// builds and source-path strings in development builds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleId {
    Num(i64),
    Name(String),
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Name(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ModuleId {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

/// One emitted module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleStat {
    /// Compilation-local id; not comparable across compilations.
    pub id: ModuleId,
    /// Stable source identifier; the join key across compilations.
    pub identifier: String,
}

/// One emitted chunk: a group of output files covering a set of modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkStat {
    pub id: u32,
    /// Output filenames, in emit order.
    #[serde(default)]
    pub files: Vec<String>,
    /// Identifiers of the modules bundled into this chunk.
    #[serde(default)]
    pub module_identifiers: Vec<String>,
}

/// Result of one compilation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationStats {
    pub modules: Vec<ModuleStat>,
    pub chunks: Vec<ChunkStat>,
    /// Entry name -> emitted files, in emit order.
    pub assets_by_entry: BTreeMap<String, Vec<String>>,
}

/// Unified report for the client + server compilations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsReport {
    /// Fatal diagnostics from either compilation. Non-empty aborts the build.
    pub errors: Vec<String>,
    pub client: CompilationStats,
    pub server: CompilationStats,
}
