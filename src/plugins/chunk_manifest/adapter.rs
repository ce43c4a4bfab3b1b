//! Hook registration across host API generations
//!
//! A capability probe picks one strategy when the plugin is applied; every
//! subscription afterwards goes through it.

use std::sync::Arc;

use anyhow::Result;

use crate::bundler::hooks::{
    HtmlFn, LegacyHandler, LoaderSourceFn, EVENT_COMPILATION, EVENT_HTML_BEFORE_GENERATION,
    EVENT_THIS_COMPILATION,
};
use crate::bundler::{Compilation, Compiler, LegacyEvent, LoaderSource};
use crate::error::ManifestError;

/// Extension points the plugin subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Loader source transform while the compilation is created
    CompilationCreated,
    /// Loader source transform once the compilation is configured
    CompilationConfigured,
    /// HTML generation sink
    HtmlBeforeGeneration,
}

/// A handler bound to the phase it subscribes to
#[derive(Clone)]
pub enum Subscription {
    CompilationCreated(Arc<LoaderSourceFn>),
    CompilationConfigured(Arc<LoaderSourceFn>),
    HtmlBeforeGeneration(Arc<HtmlFn>),
}

impl Subscription {
    pub fn phase(&self) -> Phase {
        match self {
            Subscription::CompilationCreated(_) => Phase::CompilationCreated,
            Subscription::CompilationConfigured(_) => Phase::CompilationConfigured,
            Subscription::HtmlBeforeGeneration(_) => Phase::HtmlBeforeGeneration,
        }
    }
}

/// Uniform subscription over a host's plugin API
pub trait HookAdapter: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Register a handler on the host
    fn subscribe(&self, compiler: &mut Compiler, subscription: Subscription) -> Result<(), ManifestError>;
}

/// Whether the host exposes typed hooks
pub fn supports_modern_hooks(compiler: &Compiler) -> bool {
    compiler.hooks().is_some()
}

/// Whether the host exposes legacy event registration
pub fn supports_legacy_events(compiler: &Compiler) -> bool {
    compiler.legacy().is_some()
}

/// Pick the registration strategy for a host
pub fn select(compiler: &Compiler, plugin: &str) -> Result<Box<dyn HookAdapter>, ManifestError> {
    if supports_modern_hooks(compiler) {
        Ok(Box::new(TypedHookAdapter::new(plugin)))
    } else if supports_legacy_events(compiler) {
        Ok(Box::new(LegacyEventAdapter::new(plugin)))
    } else {
        Err(ManifestError::HostIncompatible {
            plugin: plugin.to_string(),
        })
    }
}

fn incompatible(plugin: &str) -> ManifestError {
    ManifestError::HostIncompatible {
        plugin: plugin.to_string(),
    }
}

/// Taps typed hooks under the plugin's name
pub struct TypedHookAdapter {
    tap_name: String,
}

impl TypedHookAdapter {
    pub fn new(tap_name: impl Into<String>) -> Self {
        Self {
            tap_name: tap_name.into(),
        }
    }
}

impl HookAdapter for TypedHookAdapter {
    fn name(&self) -> &'static str {
        "typed hooks"
    }

    fn subscribe(&self, compiler: &mut Compiler, subscription: Subscription) -> Result<(), ManifestError> {
        let hooks = compiler
            .hooks_mut()
            .ok_or_else(|| incompatible(&self.tap_name))?;

        match subscription {
            Subscription::CompilationCreated(handler) => {
                hooks.this_compilation.tap(self.tap_name.as_str(), handler)
            }
            Subscription::CompilationConfigured(handler) => {
                hooks.compilation.tap(self.tap_name.as_str(), handler)
            }
            Subscription::HtmlBeforeGeneration(handler) => {
                hooks.html_before_generation.tap(self.tap_name.as_str(), handler)
            }
        }

        Ok(())
    }
}

/// Registers callbacks by legacy event name
pub struct LegacyEventAdapter {
    plugin: String,
}

impl LegacyEventAdapter {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
        }
    }

    /// Event name a phase is delivered under
    pub fn event_name(phase: Phase) -> &'static str {
        match phase {
            Phase::CompilationCreated => EVENT_THIS_COMPILATION,
            Phase::CompilationConfigured => EVENT_COMPILATION,
            Phase::HtmlBeforeGeneration => EVENT_HTML_BEFORE_GENERATION,
        }
    }
}

impl HookAdapter for LegacyEventAdapter {
    fn name(&self) -> &'static str {
        "legacy events"
    }

    fn subscribe(&self, compiler: &mut Compiler, subscription: Subscription) -> Result<(), ManifestError> {
        let event = Self::event_name(subscription.phase());
        let registry = compiler
            .legacy_mut()
            .ok_or_else(|| incompatible(&self.plugin))?;

        let callback = match subscription {
            Subscription::CompilationCreated(handler)
            | Subscription::CompilationConfigured(handler) => loader_source_callback(handler),
            Subscription::HtmlBeforeGeneration(handler) => html_callback(handler),
        };
        registry.plugin(event, callback);

        Ok(())
    }
}

/// Adapt a loader source handler to the in-place waterfall of legacy hosts
fn loader_source_callback(handler: Arc<LoaderSourceFn>) -> Arc<LegacyHandler> {
    Arc::new(
        move |compilation: &mut Compilation, event: &mut LegacyEvent<'_>| -> Result<()> {
            if let LegacyEvent::RequireEnsure {
                source,
                chunk,
                hash,
                chunk_id_var,
            } = event
            {
                let args = LoaderSource {
                    source: std::mem::take(source),
                    chunk: chunk.clone(),
                    hash: hash.clone(),
                    chunk_id_expression: chunk_id_var.clone(),
                };
                *source = handler(compilation, args)?;
            }
            Ok(())
        },
    )
}

/// Adapt an HTML handler to the legacy event payload
fn html_callback(handler: Arc<HtmlFn>) -> Arc<LegacyHandler> {
    Arc::new(
        move |compilation: &mut Compilation, event: &mut LegacyEvent<'_>| -> Result<()> {
            if let LegacyEvent::BeforeHtmlGeneration { data } = event {
                handler(compilation, &mut **data)?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{ChunkGraph, Chunk, HostApi, OutputOptions};

    fn tagging(tag: &'static str) -> Arc<LoaderSourceFn> {
        Arc::new(move |_: &mut Compilation, args: LoaderSource| -> Result<String> {
            Ok(format!("{}/*{}*/", args.source, tag))
        })
    }

    fn graph() -> ChunkGraph {
        let mut graph = ChunkGraph::new();
        graph.add_chunk(Chunk::entry("0", "main", ""));
        graph
    }

    #[test]
    fn test_probe() {
        let modern = Compiler::new(OutputOptions::default(), HostApi::Modern);
        let legacy = Compiler::new(OutputOptions::default(), HostApi::Legacy);
        let bare = Compiler::new(OutputOptions::default(), HostApi::None);

        assert!(supports_modern_hooks(&modern));
        assert!(!supports_modern_hooks(&legacy));
        assert_eq!(select(&modern, "p").unwrap().name(), "typed hooks");
        assert_eq!(select(&legacy, "p").unwrap().name(), "legacy events");
        assert!(matches!(
            select(&bare, "p"),
            Err(ManifestError::HostIncompatible { .. })
        ));
    }

    #[test]
    fn test_typed_subscription() {
        let mut compiler = Compiler::new(OutputOptions::default(), HostApi::Modern);
        let adapter = select(&compiler, "tagger").unwrap();
        adapter
            .subscribe(&mut compiler, Subscription::CompilationCreated(tagging("created")))
            .unwrap();
        adapter
            .subscribe(&mut compiler, Subscription::CompilationConfigured(tagging("configured")))
            .unwrap();

        let hooks = compiler.hooks().unwrap();
        assert_eq!(hooks.this_compilation.taps()[0].name, "tagger");
        assert_eq!(hooks.compilation.taps().len(), 1);
        assert!(hooks.html_before_generation.is_empty());
    }

    #[test]
    fn test_legacy_subscription_rewrites_source() {
        let mut compiler = Compiler::new(OutputOptions::default(), HostApi::Legacy);
        let adapter = select(&compiler, "tagger").unwrap();
        adapter
            .subscribe(&mut compiler, Subscription::CompilationCreated(tagging("created")))
            .unwrap();
        adapter
            .subscribe(&mut compiler, Subscription::CompilationConfigured(tagging("configured")))
            .unwrap();

        assert!(compiler.legacy().unwrap().has(EVENT_THIS_COMPILATION));
        assert!(compiler.legacy().unwrap().has(EVENT_COMPILATION));

        let compilation = compiler.run(graph()).unwrap();
        let main = compilation.assets.get("main.js").unwrap();
        assert!(main.contains("/*created*/"));
        assert!(main.contains("/*configured*/"));
    }

    #[test]
    fn test_subscribing_on_wrong_host_fails() {
        let mut bare = Compiler::new(OutputOptions::default(), HostApi::None);

        let typed = TypedHookAdapter::new("p");
        assert!(typed
            .subscribe(&mut bare, Subscription::CompilationCreated(tagging("x")))
            .is_err());
        assert!(LegacyEventAdapter::new("p")
            .subscribe(&mut bare, Subscription::CompilationCreated(tagging("x")))
            .is_err());
    }
}
