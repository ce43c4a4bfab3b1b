//! Configuration handling
//!
//! Parses and manages chunk-manifest.toml configuration files.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bundler::{HostApi, OutputOptions};

pub use schema::*;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chunk manifest plugin options
    #[serde(default)]
    pub manifest: ManifestOptions,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let mut config = Self::parse(&content)?;

        // Set root directory to the directory containing the config file
        config.root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(config)
    }

    /// Load the config file if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        Ok(Self {
            root: std::env::current_dir()?,
            ..Self::default()
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse chunk-manifest.toml")
    }

    /// Get the absolute output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.dir)
    }

    /// Output options handed to the compiler.
    ///
    /// An empty naming template counts as not configured.
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            dir: self.output_dir(),
            filename: self.output.filename.clone().filter(|f| !f.is_empty()),
            chunk_filename: self.output.chunk_filename.clone().filter(|f| !f.is_empty()),
            public_path: self.output.public_path.clone(),
        }
    }

    /// Plugin API the compiler exposes
    pub fn host_api(&self) -> HostApi {
        self.output.hooks.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.manifest.filename, "manifest.json");
        assert_eq!(config.manifest.manifest_variable, "webpackManifest");
        assert!(!config.manifest.inline_manifest);
        assert_eq!(config.manifest.output_format, OutputFormat::Json);
        assert_eq!(config.manifest.key_by, ManifestKey::Id);
        assert_eq!(config.output.filename.as_deref(), Some("[name].[chunkhash].js"));
        assert_eq!(config.host_api(), HostApi::Modern);
    }

    #[test]
    fn test_parse_overrides() {
        let config = Config::parse(
            r#"
[manifest]
filename = "chunks.js"
manifest_variable = "__CHUNKS__"
inline_manifest = true
output_format = "js"
key_by = "name"

[output]
chunk_filename = "[id].[chunkhash:8].js"
hooks = "legacy"
"#,
        )
        .unwrap();

        assert_eq!(config.manifest.filename, "chunks.js");
        assert_eq!(config.manifest.manifest_variable, "__CHUNKS__");
        assert!(config.manifest.inline_manifest);
        assert_eq!(config.manifest.output_format, OutputFormat::Js);
        assert_eq!(config.manifest.key_by, ManifestKey::Name);
        assert_eq!(config.output.chunk_filename.as_deref(), Some("[id].[chunkhash:8].js"));
        assert_eq!(config.host_api(), HostApi::Legacy);
    }

    #[test]
    fn test_load_sets_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk-manifest.toml");
        fs::write(&path, "[output]\ndir = \"build\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.output_dir(), dir.path().join("build"));
    }
}
