//! Hook registries exposed by the compiler
//!
//! Two registration styles exist side by side. Modern hosts expose typed hooks
//! that plugins tap by name. Legacy hosts only know string event names with
//! waterfall callbacks over a loosely-typed event.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use super::chunk::ChunkId;
use super::compilation::Compilation;

/// Legacy event delivering the loader source while the compilation is created
pub const EVENT_THIS_COMPILATION: &str = "this-compilation";

/// Legacy event delivering the loader source once the compilation is configured
pub const EVENT_COMPILATION: &str = "compilation";

/// Legacy event fired right before the HTML page is generated
pub const EVENT_HTML_BEFORE_GENERATION: &str = "html-webpack-plugin-before-html-generation";

/// Which registration API a host exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostApi {
    /// Typed hooks tapped by name
    Modern,
    /// String event names with waterfall callbacks
    Legacy,
    /// No plugin API at all
    None,
}

/// Arguments of the "transform loader source" extension point
#[derive(Debug, Clone)]
pub struct LoaderSource {
    /// Loader source generated so far
    pub source: String,

    /// Runtime chunk the loader is generated for
    pub chunk: ChunkId,

    /// Build hash of the compilation
    pub hash: String,

    /// Runtime variable holding the chunk id being loaded.
    /// Only provided once the compilation is configured.
    pub chunk_id_expression: Option<String>,
}

/// Data handed to plugins right before the HTML page is generated
#[derive(Debug, Clone, Default)]
pub struct HtmlPluginData {
    /// Script URLs included in the page
    pub js: Vec<String>,

    /// Inline snippets keyed by asset name, rendered into `<head>`
    pub assets: BTreeMap<String, String>,
}

/// Waterfall handler over the loader source
pub type LoaderSourceFn = dyn Fn(&mut Compilation, LoaderSource) -> Result<String> + Send + Sync;

/// Handler receiving mutable HTML generation data
pub type HtmlFn = dyn Fn(&mut Compilation, &mut HtmlPluginData) -> Result<()> + Send + Sync;

/// A named subscription on a typed hook
pub struct Tap<F: ?Sized> {
    pub name: String,
    pub handler: Arc<F>,
}

impl<F: ?Sized> Clone for Tap<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// A typed hook; taps run in registration order
pub struct Hook<F: ?Sized> {
    taps: Vec<Tap<F>>,
}

impl<F: ?Sized> Hook<F> {
    /// Subscribe a handler under a name
    pub fn tap(&mut self, name: impl Into<String>, handler: Arc<F>) {
        self.taps.push(Tap {
            name: name.into(),
            handler,
        });
    }

    /// Registered taps in call order
    pub fn taps(&self) -> &[Tap<F>] {
        &self.taps
    }

    /// Check if nothing is subscribed
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

impl<F: ?Sized> Default for Hook<F> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.taps.iter().map(|t| t.name.as_str()).collect();
        f.debug_struct("Hook").field("taps", &names).finish()
    }
}

/// Typed hooks of a modern host
#[derive(Debug, Default)]
pub struct CompilerHooks {
    /// Loader source transform while the compilation is created
    pub this_compilation: Hook<LoaderSourceFn>,

    /// Loader source transform once the compilation is configured
    pub compilation: Hook<LoaderSourceFn>,

    /// HTML generation sink
    pub html_before_generation: Hook<HtmlFn>,
}

/// Event delivered to legacy handlers
#[derive(Debug)]
pub enum LegacyEvent<'a> {
    /// Loader source waterfall; handlers rewrite `source` in place
    RequireEnsure {
        source: String,
        chunk: ChunkId,
        hash: String,
        chunk_id_var: Option<String>,
    },

    /// HTML generation data
    BeforeHtmlGeneration { data: &'a mut HtmlPluginData },
}

/// Callback registered on a legacy event name
pub type LegacyHandler = dyn Fn(&mut Compilation, &mut LegacyEvent<'_>) -> Result<()> + Send + Sync;

/// Event-name keyed callback registry of a legacy host
#[derive(Default)]
pub struct LegacyPluginRegistry {
    handlers: HashMap<String, Vec<Arc<LegacyHandler>>>,
}

impl LegacyPluginRegistry {
    /// Register a callback for an event name
    pub fn plugin(&mut self, event: &str, handler: Arc<LegacyHandler>) {
        self.handlers.entry(event.to_string()).or_default().push(handler);
    }

    /// Callbacks registered for an event, in registration order
    pub fn handlers(&self, event: &str) -> Vec<Arc<LegacyHandler>> {
        self.handlers.get(event).cloned().unwrap_or_default()
    }

    /// Check if any callback is registered for an event
    pub fn has(&self, event: &str) -> bool {
        self.handlers.get(event).is_some_and(|h| !h.is_empty())
    }
}

impl fmt::Debug for LegacyPluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self.handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        counts.sort();
        f.debug_struct("LegacyPluginRegistry").field("handlers", &counts).finish()
    }
}
