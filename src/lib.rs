//! Chunk manifest library
//!
//! A bundler plugin that moves the chunk id to file path mapping out of the
//! bootstrap runtime into a separately emitted manifest, plus the minimal host
//! compiler it plugs into.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod plugins;
pub mod utils;

pub use bundler::{ChunkGraph, Compilation, Compiler};
pub use cli::Cli;
pub use config::Config;
pub use error::ManifestError;
pub use plugins::{ChunkManifestPlugin, Plugin};
