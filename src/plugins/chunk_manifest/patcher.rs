//! Two-phase patching of the generated chunk loader
//!
//! While the compilation is created the naming template is swapped for a
//! placeholder, so the host embeds a string literal instead of its inline
//! id-to-path lookup. Once the compilation is configured the template is put
//! back and the literal is replaced with a lookup into the external manifest.

use tracing::{debug, error, warn};

use super::builder::{Manifest, ManifestBuilder};
use crate::bundler::runtime::{PUBLIC_PATH_EXPR, SCRIPT_SRC_HELPER};
use crate::bundler::{Compilation, LoaderSource};
use crate::config::ManifestKey;
use crate::error::ManifestError;

/// Naming template installed while the loader is generated
pub const PLACEHOLDER: &str = "__CHUNK_MANIFEST__";

/// Patch progress of the current compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PatchState {
    /// Nothing happened yet
    #[default]
    Unpatched,

    /// No naming template is configured; the compilation is left alone
    Skipped,

    /// The placeholder template is installed on the host
    PlaceholderInjected {
        /// `chunk_filename` as configured before the override
        saved_chunk_filename: Option<String>,
    },

    /// The template was restored and the loader rewritten
    Patched,
}

/// Scratch state of the compilation currently in flight
#[derive(Debug, Default)]
pub struct CompilationContext {
    /// Compilation this state belongs to
    pub compilation: Option<u64>,

    /// Manifest accumulated during this compilation
    pub manifest: Manifest,

    /// Patch progress
    pub state: PatchState,
}

impl CompilationContext {
    /// Whether this context tracks `compilation`
    pub fn tracks(&self, compilation: u64) -> bool {
        self.compilation == Some(compilation)
    }

    /// Switch to `compilation`, discarding the state of the previous one.
    ///
    /// A previous compilation that aborted with the placeholder installed is
    /// only reported; its override lived on its own output options.
    pub fn begin(&mut self, compilation: u64) {
        if self.tracks(compilation) {
            return;
        }

        let previous = self.compilation.replace(compilation);
        if let (Some(previous), PatchState::PlaceholderInjected { .. }) = (previous, &self.state) {
            warn!(
                "Compilation {} ended without restoring its chunk naming template, discarding its manifest",
                previous
            );
        }

        self.manifest = Manifest::new();
        self.state = PatchState::Unpatched;
    }

    /// Fail if the placeholder is still installed
    pub fn ensure_restored(&self) -> Result<(), ManifestError> {
        match (&self.state, self.compilation) {
            (PatchState::PlaceholderInjected { .. }, Some(compilation)) => {
                error!(
                    "Compilation {} reached HTML generation with the placeholder template installed",
                    compilation
                );
                Err(ManifestError::StaleOverride { compilation })
            }
            _ => Ok(()),
        }
    }
}

/// Rewrites the loader source around the external manifest
#[derive(Debug, Clone)]
pub struct RuntimeTemplatePatcher {
    manifest_variable: String,
    key_by: ManifestKey,
}

impl RuntimeTemplatePatcher {
    /// Create a patcher looking chunks up in `window[manifest_variable]`
    pub fn new(manifest_variable: impl Into<String>, key_by: ManifestKey) -> Self {
        Self {
            manifest_variable: manifest_variable.into(),
            key_by,
        }
    }

    /// Runtime expression resolving the chunk held by `chunk_id_var`.
    ///
    /// When chunks are keyed by something other than their id, the id is
    /// translated through an inline id-to-key map first. The map holds no
    /// hashes, so the loader stays stable while chunk contents change.
    pub fn lookup_expression(&self, chunk_id_var: &str, manifest: &Manifest) -> Result<String, ManifestError> {
        let index = match manifest.aliases() {
            Some(aliases) => format!("{}[{}]", serde_json::to_string(aliases)?, chunk_id_var),
            None => chunk_id_var.to_string(),
        };
        Ok(format!("window[\"{}\"][{}]", self.manifest_variable, index))
    }

    /// Phase A: install the placeholder template and extend the manifest with
    /// everything reachable from the triggering chunk.
    ///
    /// Returns the source unchanged; the placeholder reaches the loader through
    /// the overridden template when the host generates its loading code.
    pub fn inject_placeholder(
        &self,
        ctx: &mut CompilationContext,
        compilation: &mut Compilation,
        args: LoaderSource,
    ) -> Result<String, ManifestError> {
        ctx.begin(compilation.id());

        let template = match &ctx.state {
            PatchState::PlaceholderInjected { saved_chunk_filename } => saved_chunk_filename
                .clone()
                .or_else(|| compilation.output.filename.clone()),
            _ => compilation.naming_template().map(str::to_string),
        };

        let Some(template) = template else {
            debug!(
                "No naming template configured, skipping manifest for compilation {}",
                compilation.id()
            );
            ctx.state = PatchState::Skipped;
            return Ok(args.source);
        };

        if !matches!(ctx.state, PatchState::PlaceholderInjected { .. }) {
            let saved_chunk_filename = compilation.output.chunk_filename.replace(PLACEHOLDER.to_string());
            debug!(
                "Installed placeholder template, saved {:?}",
                saved_chunk_filename
            );
            ctx.state = PatchState::PlaceholderInjected { saved_chunk_filename };
        }

        let added = ManifestBuilder::new(compilation, &template, &args.hash, self.key_by)
            .register_chunk(&mut ctx.manifest, &args.chunk);
        debug!(
            "Chunk {} added {} manifest entries ({} total)",
            args.chunk,
            added,
            ctx.manifest.len()
        );

        Ok(args.source)
    }

    /// Phase B, first half: put the saved naming template back.
    ///
    /// Returns `false` when this compilation never installed the placeholder,
    /// in which case nothing must be rewritten.
    pub fn restore_template(&self, ctx: &mut CompilationContext, compilation: &mut Compilation) -> bool {
        if !ctx.tracks(compilation.id()) {
            return false;
        }

        match std::mem::take(&mut ctx.state) {
            PatchState::PlaceholderInjected { saved_chunk_filename } => {
                compilation.output.chunk_filename = saved_chunk_filename;
                ctx.state = PatchState::Patched;
                true
            }
            state => {
                ctx.state = state;
                false
            }
        }
    }

    /// Phase B, second half: replace the placeholder literal, and the host's
    /// script URL helper call, with lookups into the external manifest
    pub fn replace_placeholder(
        &self,
        source: &str,
        chunk_id_var: &str,
        manifest: &Manifest,
    ) -> Result<String, ManifestError> {
        let lookup = self.lookup_expression(chunk_id_var, manifest)?;
        let helper_call = format!("{}({})", SCRIPT_SRC_HELPER, chunk_id_var);

        Ok(source
            .replace(&format!("\"{}\"", PLACEHOLDER), &lookup)
            .replace(&helper_call, &format!("{} + {}", PUBLIC_PATH_EXPR, lookup)))
    }
}
