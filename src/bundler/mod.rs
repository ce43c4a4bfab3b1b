//! Host bundler
//!
//! Drives compilations over a chunk graph and exposes the extension points
//! plugins hook into: loader source generation and HTML generation.

mod chunk;
mod compilation;
mod graph;
pub mod hooks;
pub mod runtime;
pub mod template;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub use chunk::{Chunk, ChunkId, ChunkSpec};
pub use compilation::{Compilation, OutputOptions, DEFAULT_CHUNK_FILENAME, DEFAULT_FILENAME};
pub use graph::{ChunkGraph, ChunkGraphSpec};
pub use hooks::{
    CompilerHooks, HostApi, HtmlPluginData, LegacyEvent, LegacyPluginRegistry, LoaderSource,
};
pub use runtime::LoaderShape;

/// Compilation ids are unique per process, across compilers
static NEXT_COMPILATION_ID: AtomicU64 = AtomicU64::new(1);

/// Stage at which the loader source extension point is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoaderStage {
    /// Before the host generates its own chunk loading code
    Created,
    /// After the host generated its chunk loading code
    Configured,
}

/// The compiler: owns plugin registrations and runs compilations
pub struct Compiler {
    /// Output configuration each compilation starts from
    output: OutputOptions,

    /// Typed hooks, present on modern hosts
    hooks: Option<CompilerHooks>,

    /// Named event callbacks, present on legacy hosts
    legacy: Option<LegacyPluginRegistry>,

    /// Whether an HTML page is generated
    html: bool,
}

impl Compiler {
    /// Create a compiler exposing the given plugin API
    pub fn new(output: OutputOptions, api: HostApi) -> Self {
        Self {
            output,
            hooks: (api == HostApi::Modern).then(CompilerHooks::default),
            legacy: (api == HostApi::Legacy).then(LegacyPluginRegistry::default),
            html: false,
        }
    }

    /// Enable or disable HTML page generation
    pub fn with_html(mut self, enabled: bool) -> Self {
        self.html = enabled;
        self
    }

    /// Output options compilations start from
    pub fn output(&self) -> &OutputOptions {
        &self.output
    }

    /// Typed hooks, if this host has them
    pub fn hooks(&self) -> Option<&CompilerHooks> {
        self.hooks.as_ref()
    }

    /// Mutable typed hooks, if this host has them
    pub fn hooks_mut(&mut self) -> Option<&mut CompilerHooks> {
        self.hooks.as_mut()
    }

    /// Legacy event registry, if this host has one
    pub fn legacy(&self) -> Option<&LegacyPluginRegistry> {
        self.legacy.as_ref()
    }

    /// Mutable legacy event registry, if this host has one
    pub fn legacy_mut(&mut self) -> Option<&mut LegacyPluginRegistry> {
        self.legacy.as_mut()
    }

    /// Code shape of the generated chunk loader
    pub fn loader_shape(&self) -> LoaderShape {
        if self.hooks.is_some() {
            LoaderShape::ScriptSrcHelper
        } else {
            LoaderShape::Inline
        }
    }

    /// Run one compilation over a chunk graph
    pub fn run(&mut self, graph: ChunkGraph) -> Result<Compilation> {
        let start = Instant::now();
        let id = NEXT_COMPILATION_ID.fetch_add(1, Ordering::Relaxed);

        let mut compilation = Compilation::new(id, self.output.clone(), graph);

        // 1. Hash chunks
        compilation.seal();

        // 2. Generate the bootstrap of every runtime chunk
        for chunk_id in compilation.chunks.runtime_chunks() {
            let loader = self.render_loader(&mut compilation, &chunk_id)?;
            let bootstrap = runtime::render_bootstrap(&compilation, &chunk_id, &loader)?;

            let template = compilation
                .output
                .filename
                .clone()
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
            let filename = compilation.asset_path(&template, Some(&chunk_id));

            debug!("Emitting runtime chunk {} as {}", chunk_id, filename);
            compilation.emit_asset(filename.clone(), bootstrap);
            compilation.add_chunk_file(&chunk_id, &filename);
        }

        // 3. Emit async chunks with the configured naming template
        for chunk_id in compilation.chunks.async_chunks() {
            let template = compilation
                .naming_template()
                .unwrap_or(DEFAULT_CHUNK_FILENAME)
                .to_string();
            let filename = compilation.asset_path(&template, Some(&chunk_id));
            let source = compilation
                .chunks
                .get(&chunk_id)
                .map(|c| c.source.clone())
                .unwrap_or_default();

            debug!("Emitting async chunk {} as {}", chunk_id, filename);
            compilation.emit_asset(filename.clone(), runtime::render_async_chunk(&chunk_id, &source)?);
            compilation.add_chunk_file(&chunk_id, &filename);
        }

        // 4. Generate the HTML page
        if self.html {
            self.render_html(&mut compilation)?;
        }

        info!(
            "Compilation {} produced {} asset(s) in {:?}",
            id,
            compilation.assets.len(),
            start.elapsed()
        );

        Ok(compilation)
    }

    /// Produce the loader source of a runtime chunk through the extension point
    fn render_loader(&self, compilation: &mut Compilation, chunk_id: &ChunkId) -> Result<String> {
        let source = runtime::require_ensure_prelude();
        let mut source = self.call_loader_source(LoaderStage::Created, compilation, source, chunk_id)?;
        source.push_str(&runtime::jsonp_loader(compilation, self.loader_shape())?);

        self.call_loader_source(LoaderStage::Configured, compilation, source, chunk_id)
    }

    /// Run the loader source waterfall for one stage
    fn call_loader_source(
        &self,
        stage: LoaderStage,
        compilation: &mut Compilation,
        source: String,
        chunk_id: &ChunkId,
    ) -> Result<String> {
        let hash = compilation.hash().to_string();
        let chunk_id_expression = match stage {
            LoaderStage::Created => None,
            LoaderStage::Configured => Some(runtime::CHUNK_ID_VAR.to_string()),
        };

        if let Some(hooks) = &self.hooks {
            let hook = match stage {
                LoaderStage::Created => &hooks.this_compilation,
                LoaderStage::Configured => &hooks.compilation,
            };

            let mut source = source;
            for tap in hook.taps() {
                let args = LoaderSource {
                    source,
                    chunk: chunk_id.clone(),
                    hash: hash.clone(),
                    chunk_id_expression: chunk_id_expression.clone(),
                };
                source = (tap.handler)(compilation, args)
                    .with_context(|| format!("Plugin '{}' failed to transform loader source", tap.name))?;
            }
            return Ok(source);
        }

        if let Some(legacy) = &self.legacy {
            let event_name = match stage {
                LoaderStage::Created => hooks::EVENT_THIS_COMPILATION,
                LoaderStage::Configured => hooks::EVENT_COMPILATION,
            };

            let mut event = LegacyEvent::RequireEnsure {
                source,
                chunk: chunk_id.clone(),
                hash,
                chunk_id_var: chunk_id_expression,
            };
            for handler in legacy.handlers(event_name) {
                handler(compilation, &mut event)
                    .with_context(|| format!("Handler for '{}' failed", event_name))?;
            }

            return match event {
                LegacyEvent::RequireEnsure { source, .. } => Ok(source),
                LegacyEvent::BeforeHtmlGeneration { .. } => {
                    anyhow::bail!("Handler for '{}' replaced the event payload", event_name)
                }
            };
        }

        Ok(source)
    }

    /// Run the HTML sink and emit the page
    fn render_html(&self, compilation: &mut Compilation) -> Result<()> {
        let mut data = HtmlPluginData::default();
        for chunk_id in compilation.chunks.runtime_chunks() {
            if let Some(chunk) = compilation.chunks.get(&chunk_id) {
                for file in chunk.files.iter().filter(|f| f.ends_with(".js")) {
                    data.js.push(format!("{}{}", compilation.output.public_path, file));
                }
            }
        }

        if let Some(hooks) = &self.hooks {
            for tap in hooks.html_before_generation.taps() {
                (tap.handler)(compilation, &mut data)
                    .with_context(|| format!("Plugin '{}' failed before HTML generation", tap.name))?;
            }
        } else if let Some(legacy) = &self.legacy {
            for handler in legacy.handlers(hooks::EVENT_HTML_BEFORE_GENERATION) {
                let mut event = LegacyEvent::BeforeHtmlGeneration { data: &mut data };
                handler(compilation, &mut event).with_context(|| {
                    format!("Handler for '{}' failed", hooks::EVENT_HTML_BEFORE_GENERATION)
                })?;
            }
        }

        compilation.emit_asset("index.html", runtime::render_html(&data.js, &data.assets));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn graph() -> ChunkGraph {
        let mut graph = ChunkGraph::new();
        graph.add_chunk(Chunk::entry("0", "main", "main()").with_child("1"));
        graph.add_chunk(Chunk::async_chunk("1", "lazy()").named("lazy"));
        graph
    }

    fn output() -> OutputOptions {
        OutputOptions {
            chunk_filename: Some("[name].[chunkhash:8].js".to_string()),
            ..OutputOptions::default()
        }
    }

    #[test]
    fn test_run_without_plugins_inlines_paths() {
        let mut compiler = Compiler::new(output(), HostApi::Modern);
        let compilation = compiler.run(graph()).unwrap();

        let lazy = compilation.chunks.get("1").unwrap();
        let lazy_file = lazy.files[0].clone();
        assert!(lazy_file.starts_with("lazy.") && lazy_file.ends_with(".js"));
        assert!(compilation.assets.contains_key(&lazy_file));

        let main = compilation.assets.get("main.js").unwrap();
        assert!(main.contains(&format!("\"1\":\"{}\"", lazy_file)));
        assert!(main.contains("script.src = jsonpScriptSrc(chunkId);"));
    }

    #[test]
    fn test_compilation_ids_are_unique_across_compilers() {
        let mut first = Compiler::new(output(), HostApi::Legacy);
        let mut second = Compiler::new(output(), HostApi::Legacy);

        let a = first.run(graph()).unwrap().id();
        let b = second.run(graph()).unwrap().id();
        let c = first.run(graph()).unwrap().id();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_modern_taps_run_in_order() {
        let mut compiler = Compiler::new(output(), HostApi::Modern);
        let hooks = compiler.hooks_mut().unwrap();
        hooks.this_compilation.tap(
            "first",
            Arc::new(|_: &mut Compilation, args: LoaderSource| -> Result<String> {
                Ok(format!("{}/*a*/", args.source))
            }),
        );
        hooks.compilation.tap(
            "second",
            Arc::new(|_: &mut Compilation, args: LoaderSource| -> Result<String> {
                assert_eq!(args.chunk_id_expression.as_deref(), Some("chunkId"));
                Ok(format!("{}/*b*/", args.source))
            }),
        );

        let compilation = compiler.run(graph()).unwrap();
        let main = compilation.assets.get("main.js").unwrap();
        let a = main.find("/*a*/").unwrap();
        let loader = main.find("var promise").unwrap();
        let b = main.find("/*b*/").unwrap();
        assert!(a < loader && loader < b);
    }

    #[test]
    fn test_legacy_loader_is_inline() {
        let mut compiler = Compiler::new(output(), HostApi::Legacy).with_html(true);
        let compilation = compiler.run(graph()).unwrap();

        let main = compilation.assets.get("main.js").unwrap();
        assert!(main.contains("script.src = __webpack_require__.p + {"));
        assert!(compilation.assets.get("index.html").unwrap().contains("<script src=\"/main.js\">"));
    }
}
