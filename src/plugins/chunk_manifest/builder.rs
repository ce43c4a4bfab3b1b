//! Manifest construction from the chunk graph

use std::collections::btree_map::{BTreeMap, Iter};

use serde::Serialize;
use tracing::{debug, warn};

use crate::bundler::template::{self, PathData};
use crate::bundler::{Chunk, ChunkId, Compilation};
use crate::config::ManifestKey;

/// Mapping from chunk key to output path.
///
/// `None` marks a runtime or entry chunk that has no separately loaded file;
/// it serializes to `null`. Keys are kept sorted so serialization is canonical.
/// The key each chunk was registered under is tracked alongside and is not
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, Option<String>>,

    #[serde(skip)]
    keys: BTreeMap<ChunkId, String>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a key was already registered
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Check whether a chunk was already registered, under any key
    pub fn contains_chunk(&self, id: &str) -> bool {
        self.keys.contains_key(id)
    }

    /// Path registered for a key. The outer `Option` tells whether the key
    /// exists, the inner one whether it has a file.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries.get(key).map(|path| path.as_deref())
    }

    /// Key a chunk was registered under
    pub fn key_of(&self, id: &str) -> Option<&str> {
        self.keys.get(id).map(String::as_str)
    }

    /// Register a key for itself
    pub fn insert(&mut self, key: impl Into<String>, path: Option<String>) {
        let key = key.into();
        self.register(key.clone(), key, path);
    }

    /// Register chunk `id` under `key`
    pub fn register(&mut self, id: impl Into<ChunkId>, key: impl Into<String>, path: Option<String>) {
        let key = key.into();
        self.keys.insert(id.into(), key.clone());
        self.entries.insert(key, path);
    }

    /// Chunk id to key mapping, when any chunk is keyed by something other
    /// than its id
    pub fn aliases(&self) -> Option<&BTreeMap<ChunkId, String>> {
        self.keys
            .iter()
            .any(|(id, key)| id != key)
            .then_some(&self.keys)
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> Iter<'_, String, Option<String>> {
        self.entries.iter()
    }

    /// Number of registered chunks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if manifest is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for (key, path) in iter {
            manifest.insert(key, path);
        }
        manifest
    }
}

/// Walks the async chunk graph and records the output path of every chunk
/// reachable from a trigger chunk
pub struct ManifestBuilder<'a> {
    compilation: &'a Compilation,
    template: &'a str,
    hash: &'a str,
    key_by: ManifestKey,
}

impl<'a> ManifestBuilder<'a> {
    /// Create a builder resolving paths with `template` against `hash`
    pub fn new(compilation: &'a Compilation, template: &'a str, hash: &'a str, key_by: ManifestKey) -> Self {
        Self {
            compilation,
            template,
            hash,
            key_by,
        }
    }

    /// Manifest key of a chunk
    pub fn key(&self, chunk: &Chunk) -> String {
        match self.key_by {
            ManifestKey::Id => chunk.id.clone(),
            ManifestKey::Name => chunk.display_name().to_string(),
        }
    }

    /// Manifest value of a chunk: `None` for runtime chunks, the resolved path otherwise
    pub fn path(&self, chunk: &Chunk) -> Option<String> {
        if chunk.has_runtime() {
            return None;
        }

        Some(template::asset_path(
            self.template,
            &PathData {
                hash: self.hash,
                chunk: Some(chunk),
            },
        ))
    }

    /// Register `trigger` and every chunk reachable from it through async
    /// edges. Chunks already registered are skipped together with their
    /// subgraph, which makes the walk terminate on cycles and visit diamonds
    /// once.
    ///
    /// A chunk whose preferred key is taken by another chunk falls back to its
    /// id. Returns the number of keys added.
    pub fn register_chunk(&self, manifest: &mut Manifest, trigger: &str) -> usize {
        let Some(root) = self.compilation.chunks.get(trigger) else {
            debug!("Trigger chunk {} is not part of the compilation", trigger);
            return 0;
        };

        let before = manifest.len();
        let mut stack = vec![root];

        while let Some(chunk) = stack.pop() {
            if manifest.contains_chunk(&chunk.id) {
                continue;
            }

            let mut key = self.key(chunk);
            if manifest.contains_key(&key) {
                warn!(
                    "Manifest key '{}' is already taken, registering chunk {} by id",
                    key, chunk.id
                );
                key = chunk.id.clone();
                if manifest.contains_key(&key) {
                    warn!("Chunk {} has no free manifest key, leaving it out", chunk.id);
                    continue;
                }
            }

            let path = self.path(chunk);
            debug!("Manifest entry {} -> {:?}", key, path);
            manifest.register(chunk.id.clone(), key, path);

            // Reverse so children are visited in declaration order
            let children: Vec<_> = self.compilation.chunks.async_dependencies(&chunk.id).collect();
            stack.extend(children.into_iter().rev());
        }

        manifest.len() - before
    }
}
