//! Chunk manifest plugin
//!
//! Moves the chunk id to file path mapping out of the generated loader and
//! into a standalone manifest, so that content hashes of async chunks no
//! longer change the runtime chunk. The loader looks paths up in
//! `window[<manifest_variable>]` instead, which the page defines either by
//! loading the emitted manifest or through an inline `<script>`.

pub mod adapter;
pub mod builder;
pub mod emitter;
pub mod patcher;

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::bundler::{Compilation, Compiler, HtmlPluginData, LoaderSource};
use crate::config::ManifestOptions;
use crate::plugins::Plugin;

pub use adapter::{HookAdapter, Phase, Subscription};
pub use builder::{Manifest, ManifestBuilder};
pub use emitter::{Artifact, ManifestEmitter};
pub use patcher::{CompilationContext, PatchState, RuntimeTemplatePatcher, PLACEHOLDER};

/// Name the plugin registers its hooks under
pub const PLUGIN_NAME: &str = "chunk-manifest";

/// Extracts the chunk manifest from the runtime chunk
pub struct ChunkManifestPlugin {
    options: ManifestOptions,
    context: Arc<Mutex<CompilationContext>>,
}

impl ChunkManifestPlugin {
    pub fn new(options: ManifestOptions) -> Self {
        Self {
            options,
            context: Arc::new(Mutex::new(CompilationContext::default())),
        }
    }

    pub fn options(&self) -> &ManifestOptions {
        &self.options
    }

    /// Manifest of the most recent compilation
    pub fn manifest(&self) -> Manifest {
        self.context.lock().manifest.clone()
    }

    /// Patch progress of the most recent compilation
    pub fn state(&self) -> PatchState {
        self.context.lock().state.clone()
    }

    fn inject_placeholder(&self) -> Subscription {
        let context = Arc::clone(&self.context);
        let patcher = RuntimeTemplatePatcher::new(&self.options.manifest_variable, self.options.key_by);

        Subscription::CompilationCreated(Arc::new(
            move |compilation: &mut Compilation, args: LoaderSource| -> Result<String> {
                let mut ctx = context.lock();
                Ok(patcher.inject_placeholder(&mut ctx, compilation, args)?)
            },
        ))
    }

    fn replace_placeholder(&self) -> Subscription {
        let context = Arc::clone(&self.context);
        let patcher = RuntimeTemplatePatcher::new(&self.options.manifest_variable, self.options.key_by);
        let emitter = ManifestEmitter::new(&self.options);

        Subscription::CompilationConfigured(Arc::new(
            move |compilation: &mut Compilation, args: LoaderSource| -> Result<String> {
                let Some(chunk_id_var) = args.chunk_id_expression.as_deref() else {
                    return Ok(args.source);
                };

                let mut ctx = context.lock();
                if !patcher.restore_template(&mut ctx, compilation) {
                    debug!(
                        "Compilation {} has no placeholder installed, leaving loader as is",
                        compilation.id()
                    );
                    return Ok(args.source);
                }

                let source = patcher.replace_placeholder(&args.source, chunk_id_var, &ctx.manifest)?;
                let artifact = emitter.emit_artifact(&ctx.manifest)?;
                emitter.register(compilation, &args.chunk, artifact);

                Ok(source)
            },
        ))
    }

    fn inline_manifest(&self) -> Subscription {
        let context = Arc::clone(&self.context);
        let emitter = ManifestEmitter::new(&self.options);

        Subscription::HtmlBeforeGeneration(Arc::new(
            move |compilation: &mut Compilation, data: &mut HtmlPluginData| -> Result<()> {
                let ctx = context.lock();
                if !ctx.tracks(compilation.id()) {
                    return Ok(());
                }
                ctx.ensure_restored()?;

                if ctx.state == PatchState::Patched {
                    let script = emitter.inline_script(&ctx.manifest)?;
                    debug!("Inlining manifest as {}", emitter.inline_key());
                    data.assets.insert(emitter.inline_key().to_string(), script);
                }
                Ok(())
            },
        ))
    }
}

impl Default for ChunkManifestPlugin {
    fn default() -> Self {
        Self::new(ManifestOptions::default())
    }
}

impl Plugin for ChunkManifestPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn apply(&self, compiler: &mut Compiler) -> Result<()> {
        let adapter = adapter::select(compiler, PLUGIN_NAME)?;
        info!(
            "Applying {} through {} (manifest: {})",
            PLUGIN_NAME,
            adapter.name(),
            self.options.filename
        );

        adapter.subscribe(compiler, self.inject_placeholder())?;
        adapter.subscribe(compiler, self.replace_placeholder())?;
        if self.options.inline_manifest {
            adapter.subscribe(compiler, self.inline_manifest())?;
        }

        Ok(())
    }
}
