//! Configuration schema definitions

use serde::{Deserialize, Serialize};

use crate::bundler::HostApi;

/// Serialization form of the manifest artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain JSON
    #[default]
    Json,
    /// `window.<variable> = <json>;`
    Js,
}

/// Which chunk attribute keys the manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKey {
    /// Chunk id
    #[default]
    Id,
    /// Chunk name, falling back to the id for unnamed chunks
    Name,
}

/// Options of the chunk manifest plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOptions {
    /// Name of the emitted manifest artifact
    #[serde(default = "default_manifest_filename")]
    pub filename: String,

    /// Global variable holding the manifest at runtime
    #[serde(default = "default_manifest_variable")]
    pub manifest_variable: String,

    /// Also inline the manifest into the generated HTML page
    #[serde(default)]
    pub inline_manifest: bool,

    /// Artifact serialization form
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Manifest key policy
    #[serde(default)]
    pub key_by: ManifestKey,

    /// Pretty-print the JSON
    #[serde(default)]
    pub pretty: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            filename: default_manifest_filename(),
            manifest_variable: default_manifest_variable(),
            inline_manifest: false,
            output_format: OutputFormat::default(),
            key_by: ManifestKey::default(),
            pretty: false,
        }
    }
}

fn default_manifest_filename() -> String {
    "manifest.json".to_string()
}

fn default_manifest_variable() -> String {
    "webpackManifest".to_string()
}

/// Plugin API flavour of the host compiler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HooksConfig {
    #[default]
    Modern,
    Legacy,
}

impl From<HooksConfig> for HostApi {
    fn from(hooks: HooksConfig) -> Self {
        match hooks {
            HooksConfig::Modern => HostApi::Modern,
            HooksConfig::Legacy => HostApi::Legacy,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Naming template for entry chunks
    #[serde(default = "default_filename")]
    pub filename: Option<String>,

    /// Naming template for async chunks
    #[serde(default)]
    pub chunk_filename: Option<String>,

    /// Public URL prefix for chunks
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Generate an HTML page
    #[serde(default)]
    pub html: bool,

    /// Plugin API the compiler exposes
    #[serde(default)]
    pub hooks: HooksConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            filename: default_filename(),
            chunk_filename: None,
            public_path: default_public_path(),
            html: false,
            hooks: HooksConfig::default(),
        }
    }
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_filename() -> Option<String> {
    Some("[name].[chunkhash].js".to_string())
}

fn default_public_path() -> String {
    "/".to_string()
}
