//! Chunk index - maps server modules to the client assets they need.
//!
//! Server-side rendering only touches a subset of the lazily-loadable
//! components per request. The index joins the two compilations so a
//! rendered page can ship exactly the chunk files its tree used, instead of
//! the whole client bundle.
//!
//! The join key is the module *identifier* (a stable source path), never the
//! numeric id: ids are assigned independently by each compilation.

use crate::build::{CompilationStats, ModuleId};
use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;

/// Extension of client script assets.
pub const SCRIPT_EXT: &str = "js";
/// Extension of client style assets.
pub const STYLE_EXT: &str = "css";
/// Entry whose first script carries the client runtime bootstrap.
pub const MAIN_ENTRY: &str = "main";

/// Precomputed mapping from a server module id to the client files its
/// chunks emit. Built once per successful build and read-only afterwards;
/// a rebuild constructs a fresh index rather than mutating this one.
#[derive(Debug)]
pub struct ChunkIndex {
    by_module: FxHashMap<ModuleId, Vec<String>>,
    main_script: String,
}

/// Correlate the client and server compilations into a `ChunkIndex`.
pub fn build_index(client: &CompilationStats, server: &CompilationStats) -> Result<ChunkIndex> {
    // Union of chunk files per client module identifier, order-preserving.
    let mut by_identifier: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for chunk in &client.chunks {
        for identifier in &chunk.module_identifiers {
            let files = by_identifier.entry(identifier).or_default();
            for file in &chunk.files {
                if !files.contains(&file.as_str()) {
                    files.push(file);
                }
            }
        }
    }

    // Join server modules against client files by identifier.
    let mut by_module = FxHashMap::default();
    for module in &server.modules {
        if let Some(files) = by_identifier.get(module.identifier.as_str()) {
            by_module.insert(
                module.id.clone(),
                files.iter().map(ToString::to_string).collect(),
            );
        }
    }

    let main_script = client
        .assets_by_entry
        .get(MAIN_ENTRY)
        .and_then(|files| files.iter().find(|f| has_extension(f.as_str(), SCRIPT_EXT)))
        .cloned()
        .context("client stats list no main entry script")?;

    Ok(ChunkIndex {
        by_module,
        main_script,
    })
}

impl ChunkIndex {
    /// The client runtime bootstrap script, shipped with every page.
    pub fn main_script(&self) -> &str {
        &self.main_script
    }

    /// Number of server modules with client assets.
    pub fn len(&self) -> usize {
        self.by_module.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_module.is_empty()
    }

    /// Files of the given extension needed by a set of used module ids.
    /// Deduplicated, insertion order preserved.
    pub fn files_for(&self, ids: &[ModuleId], ext: &str) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for id in ids {
            let Some(files) = self.by_module.get(id) else {
                continue;
            };
            for file in files {
                if has_extension(file, ext) && seen.insert(file.as_str()) {
                    out.push(file.clone());
                }
            }
        }
        out
    }

    /// Scripts for one render: the used-module chunks plus the runtime
    /// bootstrap, which appears exactly once.
    pub fn scripts_for(&self, ids: &[ModuleId]) -> Vec<String> {
        let mut scripts = self.files_for(ids, SCRIPT_EXT);
        if !scripts.iter().any(|f| *f == self.main_script) {
            scripts.push(self.main_script.clone());
        }
        scripts
    }

    /// Styles for one render.
    pub fn styles_for(&self, ids: &[ModuleId]) -> Vec<String> {
        self.files_for(ids, STYLE_EXT)
    }
}

fn has_extension(file: &str, ext: &str) -> bool {
    Path::new(file).extension().and_then(|e| e.to_str()) == Some(ext)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{ChunkStat, ModuleStat};

    fn chunk(id: u32, files: &[&str], identifiers: &[&str]) -> ChunkStat {
        ChunkStat {
            id,
            files: files.iter().map(ToString::to_string).collect(),
            module_identifiers: identifiers.iter().map(ToString::to_string).collect(),
        }
    }

    fn module(id: ModuleId, identifier: &str) -> ModuleStat {
        ModuleStat {
            id,
            identifier: identifier.to_string(),
        }
    }

    fn client(chunks: Vec<ChunkStat>, main: &[&str]) -> CompilationStats {
        let mut stats = CompilationStats {
            chunks,
            ..CompilationStats::default()
        };
        stats.assets_by_entry.insert(
            MAIN_ENTRY.to_string(),
            main.iter().map(ToString::to_string).collect(),
        );
        stats
    }

    fn server(modules: Vec<ModuleStat>) -> CompilationStats {
        CompilationStats {
            modules,
            ..CompilationStats::default()
        }
    }

    #[test]
    fn test_join_by_identifier() {
        // Client module id (1) and server module id ("srv-1") differ; only
        // the identifier lines them up.
        let client = client(vec![chunk(1, &["a.js"], &["./X"])], &["main.js"]);
        let server = server(vec![module("srv-1".into(), "./X")]);

        let index = build_index(&client, &server).unwrap();
        assert!(!index.is_empty());
        assert_eq!(index.len(), 1);
        assert_eq!(index.main_script(), "main.js");
        assert_eq!(index.files_for(&["srv-1".into()], SCRIPT_EXT), vec!["a.js"]);
    }

    #[test]
    fn test_union_across_chunks_preserves_order() {
        // Two chunks reference ./X; its entry is the deduplicated union of
        // both file lists in first-seen order.
        let client = client(
            vec![
                chunk(0, &["one.js", "shared.css"], &["./X"]),
                chunk(1, &["two.js", "shared.css"], &["./X", "./Y"]),
            ],
            &["main.js"],
        );
        let server = server(vec![module(7.into(), "./X"), module(8.into(), "./Y")]);

        let index = build_index(&client, &server).unwrap();
        assert_eq!(
            index.files_for(&[7.into()], SCRIPT_EXT),
            vec!["one.js", "two.js"]
        );
        assert_eq!(index.files_for(&[7.into()], STYLE_EXT), vec!["shared.css"]);
        assert_eq!(index.files_for(&[8.into()], SCRIPT_EXT), vec!["two.js"]);
    }

    #[test]
    fn test_files_for_is_idempotent() {
        let client = client(vec![chunk(0, &["a.js", "b.js"], &["./X"])], &["main.js"]);
        let server = server(vec![module(1.into(), "./X")]);
        let index = build_index(&client, &server).unwrap();

        let ids: Vec<ModuleId> = vec![1.into(), 1.into()];
        let first = index.files_for(&ids, SCRIPT_EXT);
        let second = index.files_for(&ids, SCRIPT_EXT);
        assert_eq!(first, second);
        assert_eq!(first, vec!["a.js", "b.js"]);
    }

    #[test]
    fn test_main_script_always_present_exactly_once() {
        let client = client(
            vec![chunk(0, &["main.js", "about.js"], &["./About"])],
            &["main.css", "main.js"],
        );
        let server = server(vec![module(3.into(), "./About")]);
        let index = build_index(&client, &server).unwrap();

        // Empty render still gets the bootstrap.
        assert_eq!(index.scripts_for(&[]), vec!["main.js"]);

        // A chunk that already contains main.js does not duplicate it.
        let scripts = index.scripts_for(&[3.into()]);
        assert_eq!(scripts, vec!["main.js", "about.js"]);
        assert_eq!(scripts.iter().filter(|f| *f == "main.js").count(), 1);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let client = client(vec![chunk(0, &["a.js"], &["./X"])], &["main.js"]);
        let server = server(vec![module(1.into(), "./X")]);
        let index = build_index(&client, &server).unwrap();

        assert!(index.files_for(&[99.into()], SCRIPT_EXT).is_empty());
        assert_eq!(index.scripts_for(&[99.into()]), vec!["main.js"]);
    }

    #[test]
    fn test_missing_main_entry_is_error() {
        let client = CompilationStats::default();
        let server = CompilationStats::default();
        assert!(build_index(&client, &server).is_err());
    }

    #[test]
    fn test_server_only_modules_have_no_entry() {
        // ./ServerOnly never appears in a client chunk, so the index skips it.
        let client = client(vec![chunk(0, &["a.js"], &["./X"])], &["main.js"]);
        let server = server(vec![
            module(1.into(), "./X"),
            module(2.into(), "./ServerOnly"),
        ]);
        let index = build_index(&client, &server).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.files_for(&[2.into()], SCRIPT_EXT).is_empty());
    }
}
