//! Chunks produced by code splitting

use serde::{Deserialize, Serialize};

/// Stable chunk identifier, unique within a compilation
pub type ChunkId = String;

/// A chunk is a unit of output code the bundler can load independently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk identifier
    pub id: ChunkId,

    /// Optional human readable name (used by `[name]`)
    pub name: Option<String>,

    /// Entry chunks carry the runtime and are never fetched lazily
    pub entry: bool,

    /// Concatenated module code of this chunk
    pub source: String,

    /// Chunks loaded on demand from this one
    pub children: Vec<ChunkId>,

    /// Content hash, filled in when the compilation is sealed
    pub hash: String,

    /// Output files produced for this chunk
    pub files: Vec<String>,
}

impl Chunk {
    /// Create a new entry chunk
    pub fn entry(id: impl Into<ChunkId>, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            entry: true,
            source: source.into(),
            children: Vec::new(),
            hash: String::new(),
            files: Vec::new(),
        }
    }

    /// Create a new async chunk
    pub fn async_chunk(id: impl Into<ChunkId>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            entry: false,
            source: source.into(),
            children: Vec::new(),
            hash: String::new(),
            files: Vec::new(),
        }
    }

    /// Set the chunk name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an async dependency
    pub fn with_child(mut self, child: impl Into<ChunkId>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Whether this chunk contains runtime code or is an entry point
    pub fn has_runtime(&self) -> bool {
        self.entry
    }

    /// Name used for `[name]`, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Record an output file, ignoring duplicates
    pub fn add_file(&mut self, file: impl Into<String>) {
        let file = file.into();
        if !self.files.contains(&file) {
            self.files.push(file);
        }
    }
}

/// Serialized chunk description, as read from a chunk graph file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSpec {
    pub id: ChunkId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub entry: bool,

    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChunkId>,
}

impl From<ChunkSpec> for Chunk {
    fn from(spec: ChunkSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name,
            entry: spec.entry,
            source: spec.source,
            children: spec.children,
            hash: String::new(),
            files: Vec::new(),
        }
    }
}
