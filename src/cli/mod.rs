//! Command-line interface
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `build`: Build a chunk graph and emit the manifest
//! - `watch`: Rebuild on every change of the chunk graph
//! - `init`: Project scaffolding

mod build;
mod init;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

pub use build::{BuildCommand, BuildOptions, BuildReport, BuildSession};
pub use init::InitCommand;
pub use watch::WatchCommand;

/// Extract chunk id to file mappings from the bootstrap runtime into a manifest
#[derive(Parser, Debug)]
#[command(name = "chunk-manifest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to chunk-manifest.toml config file
    #[arg(short, long, global = true, default_value = "chunk-manifest.toml", env = "CHUNK_MANIFEST_CONFIG")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a chunk graph and emit its assets
    Build(BuildCommand),

    /// Rebuild whenever the chunk graph changes
    Watch(WatchCommand),

    /// Initialize a new project
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Commands::Build(cmd) => cmd.execute(&self.config).await,
            Commands::Watch(cmd) => cmd.execute(&self.config).await,
            Commands::Init(cmd) => cmd.execute().await,
        }
    }
}

fn print_banner() {
    eprintln!(
        "\n{} {}\n",
        "chunk-manifest".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
