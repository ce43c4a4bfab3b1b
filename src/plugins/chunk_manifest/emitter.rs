//! Manifest serialization and asset registration

use tracing::info;

use super::builder::Manifest;
use crate::bundler::Compilation;
use crate::config::{ManifestOptions, OutputFormat};
use crate::error::ManifestError;

/// A serialized manifest ready to be emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Output file name
    pub filename: String,

    /// File content
    pub content: String,
}

impl Artifact {
    /// Content length in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Serializes the manifest as a build artifact or an inline script
#[derive(Debug, Clone)]
pub struct ManifestEmitter {
    filename: String,
    manifest_variable: String,
    format: OutputFormat,
    pretty: bool,
}

impl ManifestEmitter {
    pub fn new(options: &ManifestOptions) -> Self {
        Self {
            filename: options.filename.clone(),
            manifest_variable: options.manifest_variable.clone(),
            format: options.output_format,
            pretty: options.pretty,
        }
    }

    fn to_json(&self, manifest: &Manifest) -> Result<String, ManifestError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(manifest)?
        } else {
            serde_json::to_string(manifest)?
        };
        Ok(json)
    }

    /// Serialize the manifest in the configured format
    pub fn emit_artifact(&self, manifest: &Manifest) -> Result<Artifact, ManifestError> {
        let json = self.to_json(manifest)?;
        let content = match self.format {
            OutputFormat::Json => json,
            OutputFormat::Js => format!("window.{} = {};", self.manifest_variable, json),
        };

        Ok(Artifact {
            filename: self.filename.clone(),
            content,
        })
    }

    /// Register the artifact as a compilation asset owned by `chunk`
    pub fn register(&self, compilation: &mut Compilation, chunk: &str, artifact: Artifact) {
        info!("Registering {} ({} bytes)", artifact.filename, artifact.size());
        compilation.add_chunk_file(chunk, &artifact.filename);
        compilation.emit_asset(artifact.filename, artifact.content);
    }

    /// Inline `<script>` defining the manifest variable, always compact
    pub fn inline_script(&self, manifest: &Manifest) -> Result<String, ManifestError> {
        Ok(format!(
            "<script>window.{}={}</script>",
            self.manifest_variable,
            serde_json::to_string(manifest)?
        ))
    }

    /// Key the inline script is stored under in the HTML sink
    pub fn inline_key(&self) -> &str {
        &self.manifest_variable
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn manifest() -> Manifest {
        vec![
            ("0", None),
            ("1", Some("lazy.abc.js".to_string())),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_json_artifact() {
        let emitter = ManifestEmitter::new(&ManifestOptions::default());
        let artifact = emitter.emit_artifact(&manifest()).unwrap();

        assert_eq!(artifact.filename, "manifest.json");
        assert_eq!(artifact.content, r#"{"0":null,"1":"lazy.abc.js"}"#);
        assert_eq!(artifact.size(), artifact.content.len());
    }

    #[test]
    fn test_js_artifact() {
        let emitter = ManifestEmitter::new(&ManifestOptions {
            filename: "manifest.js".to_string(),
            output_format: OutputFormat::Js,
            ..ManifestOptions::default()
        });
        let artifact = emitter.emit_artifact(&manifest()).unwrap();

        assert_eq!(
            artifact.content,
            r#"window.webpackManifest = {"0":null,"1":"lazy.abc.js"};"#
        );
    }

    #[test]
    fn test_pretty_artifact() {
        let emitter = ManifestEmitter::new(&ManifestOptions {
            pretty: true,
            ..ManifestOptions::default()
        });
        let artifact = emitter.emit_artifact(&manifest()).unwrap();

        assert_eq!(artifact.content, "{\n  \"0\": null,\n  \"1\": \"lazy.abc.js\"\n}");
    }

    #[test]
    fn test_inline_script() {
        let emitter = ManifestEmitter::new(&ManifestOptions {
            manifest_variable: "__CHUNKS__".to_string(),
            pretty: true,
            ..ManifestOptions::default()
        });

        assert_eq!(
            emitter.inline_script(&manifest()).unwrap(),
            r#"<script>window.__CHUNKS__={"0":null,"1":"lazy.abc.js"}</script>"#
        );
        assert_eq!(emitter.inline_key(), "__CHUNKS__");
    }

    #[test]
    fn test_output_is_deterministic() {
        let emitter = ManifestEmitter::new(&ManifestOptions::default());
        let reversed: Manifest = vec![
            ("1", Some("lazy.abc.js".to_string())),
            ("0", None),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            emitter.emit_artifact(&manifest()).unwrap(),
            emitter.emit_artifact(&reversed).unwrap()
        );
    }
}
