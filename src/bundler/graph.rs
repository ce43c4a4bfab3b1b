//! Chunk graph data structures

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::chunk::{Chunk, ChunkId, ChunkSpec};

/// On-disk description of a chunk graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkGraphSpec {
    #[serde(default)]
    pub chunks: Vec<ChunkSpec>,
}

/// The chunk dependency graph of one compilation.
///
/// Chunks are indexed by id in a `BTreeMap` so every iteration over the graph
/// happens in a stable order. Async edges may form cycles.
#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
    chunks: BTreeMap<ChunkId, Chunk>,
}

impl ChunkGraph {
    /// Create a new empty chunk graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a graph description from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read chunk graph: {}", path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse chunk graph: {}", path.display()))
    }

    /// Parse a graph description from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let spec: ChunkGraphSpec = serde_json::from_str(content)?;
        Self::from_spec(spec)
    }

    /// Build a graph from its description, checking that every edge resolves
    pub fn from_spec(spec: ChunkGraphSpec) -> Result<Self> {
        let mut graph = Self::new();
        for chunk in spec.chunks {
            graph.add_chunk(chunk.into());
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Add a chunk to the graph, replacing any chunk with the same id
    pub fn add_chunk(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.id.clone(), chunk);
    }

    /// Add an async edge between two chunks
    pub fn add_async_dependency(&mut self, from: &str, to: &str) {
        if let Some(chunk) = self.chunks.get_mut(from) {
            if !chunk.children.iter().any(|c| c == to) {
                chunk.children.push(to.to_string());
            }
        }
    }

    /// Ensure every async edge points at a known chunk
    pub fn validate(&self) -> Result<()> {
        for chunk in self.chunks.values() {
            for child in &chunk.children {
                if !self.chunks.contains_key(child) {
                    anyhow::bail!(
                        "Chunk '{}' depends on unknown chunk '{}'",
                        chunk.id,
                        child
                    );
                }
            }
        }
        Ok(())
    }

    /// Get a chunk by id
    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    /// Get a mutable reference to a chunk
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Chunk> {
        self.chunks.get_mut(id)
    }

    /// Chunks reachable from `id` through a single async edge
    pub fn async_dependencies<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.chunks
            .get(id)
            .into_iter()
            .flat_map(|chunk| chunk.children.iter())
            .filter_map(move |child| self.chunks.get(child))
    }

    /// Chunks that carry runtime code, in id order
    pub fn runtime_chunks(&self) -> Vec<ChunkId> {
        self.chunks
            .values()
            .filter(|c| c.has_runtime())
            .map(|c| c.id.clone())
            .collect()
    }

    /// Chunks loaded on demand, in id order
    pub fn async_chunks(&self) -> Vec<ChunkId> {
        self.chunks
            .values()
            .filter(|c| !c.has_runtime())
            .map(|c| c.id.clone())
            .collect()
    }

    /// Iterate over all chunks in id order
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Iterate mutably over all chunks in id order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }

    /// Total number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_from_json() {
        let graph = ChunkGraph::from_json(
            r#"{"chunks": [
                {"id": "0", "name": "main", "entry": true, "children": ["1"]},
                {"id": "1", "source": "lazy()"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.runtime_chunks(), vec!["0".to_string()]);
        assert_eq!(graph.async_chunks(), vec!["1".to_string()]);

        let deps: Vec<_> = graph.async_dependencies("0").map(|c| c.id.as_str()).collect();
        assert_eq!(deps, vec!["1"]);
    }

    #[test]
    fn test_unknown_child_is_rejected() {
        let err = ChunkGraph::from_json(
            r#"{"chunks": [{"id": "0", "entry": true, "children": ["9"]}]}"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("unknown chunk '9'"));
    }

    #[test]
    fn test_add_async_dependency_dedups() {
        let mut graph = ChunkGraph::new();
        graph.add_chunk(Chunk::entry("a", "a", ""));
        graph.add_chunk(Chunk::async_chunk("b", ""));
        graph.add_async_dependency("a", "b");
        graph.add_async_dependency("a", "b");

        assert_eq!(graph.get("a").unwrap().children, vec!["b".to_string()]);
    }
}
