//! Errors raised by the chunk manifest plugin

use thiserror::Error;

/// Failures the plugin reports to its host
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The host exposes neither typed hooks nor legacy event registration
    #[error("plugin '{plugin}' cannot be applied: the compiler exposes neither typed hooks nor legacy plugin events")]
    HostIncompatible { plugin: String },

    /// A compilation overrode the naming template and never restored it
    #[error("compilation {compilation} overrode the chunk naming template but never restored it")]
    StaleOverride { compilation: u64 },

    /// The manifest could not be serialized
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}
