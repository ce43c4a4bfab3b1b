//! A single compilation: one pass over a chunk graph producing assets

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::graph::ChunkGraph;
use super::template::{self, PathData};
use crate::utils::hash_content;

/// Output naming used when no `filename` is configured
pub const DEFAULT_FILENAME: &str = "[name].js";

/// Naming used for async chunks when neither template is configured
pub const DEFAULT_CHUNK_FILENAME: &str = "[id].js";

/// Output options of the host. `chunk_filename` is the naming template
/// plugins may temporarily override during a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// Output directory
    pub dir: PathBuf,

    /// Naming template for entry chunks
    pub filename: Option<String>,

    /// Naming template for async chunks
    pub chunk_filename: Option<String>,

    /// Public URL prefix the runtime loads chunks from
    pub public_path: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            filename: Some(DEFAULT_FILENAME.to_string()),
            chunk_filename: None,
            public_path: "/".to_string(),
        }
    }
}

/// State of one compilation
#[derive(Debug)]
pub struct Compilation {
    id: u64,

    /// Output options, mutable by plugins for the duration of the compilation
    pub output: OutputOptions,

    /// Chunk graph of this compilation
    pub chunks: ChunkGraph,

    /// Emitted assets by file name
    pub assets: BTreeMap<String, String>,

    hash: String,
}

impl Compilation {
    /// Create a new compilation over a chunk graph
    pub fn new(id: u64, output: OutputOptions, chunks: ChunkGraph) -> Self {
        Self {
            id,
            output,
            chunks,
            assets: BTreeMap::new(),
            hash: String::new(),
        }
    }

    /// Identifier of this compilation, unique within the process
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Build hash, available once sealed
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Compute chunk hashes and the build hash.
    ///
    /// Chunks are visited in id order so the build hash only depends on the
    /// graph contents.
    pub fn seal(&mut self) {
        let mut combined = String::new();

        for chunk in self.chunks.iter_mut() {
            let input = format!("{}\0{}", chunk.id, chunk.source);
            chunk.hash = hash_content(input.as_bytes());
            combined.push_str(&chunk.hash);
        }

        self.hash = hash_content(combined.as_bytes());
        debug!("Sealed compilation {} with hash {}", self.id, self.hash);
    }

    /// The naming template async chunk paths are computed from, if any
    pub fn naming_template(&self) -> Option<&str> {
        self.output
            .chunk_filename
            .as_deref()
            .or(self.output.filename.as_deref())
    }

    /// Resolve a naming template for a chunk of this compilation
    pub fn asset_path(&self, template: &str, chunk: Option<&str>) -> String {
        template::asset_path(
            template,
            &PathData {
                hash: &self.hash,
                chunk: chunk.and_then(|id| self.chunks.get(id)),
            },
        )
    }

    /// Register an output asset, replacing previous content
    pub fn emit_asset(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.assets.insert(name.into(), content.into());
    }

    /// Record an output file on a chunk
    pub fn add_chunk_file(&mut self, chunk_id: &str, file: &str) {
        if let Some(chunk) = self.chunks.get_mut(chunk_id) {
            chunk.add_file(file);
        }
    }

    /// Write all assets below `dir`
    pub fn write_assets(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.assets.len());

        for (name, content) in &self.assets {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            fs::write(&path, content)
                .with_context(|| format!("Failed to write asset: {}", path.display()))?;
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::Chunk;

    fn compilation() -> Compilation {
        let mut graph = ChunkGraph::new();
        graph.add_chunk(Chunk::entry("0", "main", "main()").with_child("1"));
        graph.add_chunk(Chunk::async_chunk("1", "lazy()").named("lazy"));
        Compilation::new(1, OutputOptions::default(), graph)
    }

    #[test]
    fn test_seal_is_deterministic() {
        let mut a = compilation();
        let mut b = compilation();
        a.seal();
        b.seal();

        assert_eq!(a.hash(), b.hash());
        assert!(!a.hash().is_empty());
        assert_eq!(a.chunks.get("1").unwrap().hash, b.chunks.get("1").unwrap().hash);
    }

    #[test]
    fn test_naming_template_prefers_chunk_filename() {
        let mut c = compilation();
        assert_eq!(c.naming_template(), Some(DEFAULT_FILENAME));

        c.output.chunk_filename = Some("[id].chunk.js".to_string());
        assert_eq!(c.naming_template(), Some("[id].chunk.js"));

        c.output.chunk_filename = None;
        c.output.filename = None;
        assert_eq!(c.naming_template(), None);
    }

    #[test]
    fn test_write_assets() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = compilation();
        c.emit_asset("js/app.js", "app");

        let written = c.write_assets(dir.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("js/app.js")).unwrap(), "app");
    }
}
