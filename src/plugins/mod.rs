//! Plugin system
//!
//! Plugins are applied to a compiler once and register their handlers on
//! whichever extension points the compiler exposes.

pub mod chunk_manifest;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::bundler::Compiler;

pub use chunk_manifest::ChunkManifestPlugin;

/// Plugin trait - implement this to extend a compiler
pub trait Plugin: Send + Sync {
    /// Plugin name for logging and debugging
    fn name(&self) -> &str;

    /// Register the plugin's handlers on the compiler
    fn apply(&self, compiler: &mut Compiler) -> Result<()>;
}

/// Plugin manager
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginManager {
    /// Create a new plugin manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Registered plugins in registration order
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Apply every registered plugin to the compiler
    pub fn apply(&self, compiler: &mut Compiler) -> Result<()> {
        for plugin in &self.plugins {
            debug!("Applying plugin {}", plugin.name());
            plugin
                .apply(compiler)
                .with_context(|| format!("Failed to apply plugin '{}'", plugin.name()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{HostApi, OutputOptions};

    struct Noop;

    impl Plugin for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn apply(&self, _compiler: &mut Compiler) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_apply_in_order() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(Noop));
        manager.register(Arc::new(ChunkManifestPlugin::default()));

        let mut compiler = Compiler::new(OutputOptions::default(), HostApi::Modern);
        manager.apply(&mut compiler).unwrap();

        assert_eq!(manager.plugins()[0].name(), "noop");
        assert_eq!(compiler.hooks().unwrap().this_compilation.taps().len(), 1);
    }

    #[test]
    fn test_apply_error_names_plugin() {
        let mut manager = PluginManager::new();
        manager.register(Arc::new(ChunkManifestPlugin::default()));

        let mut compiler = Compiler::new(OutputOptions::default(), HostApi::None);
        let err = manager.apply(&mut compiler).unwrap_err();
        assert!(err.to_string().contains("chunk-manifest"));
    }
}
