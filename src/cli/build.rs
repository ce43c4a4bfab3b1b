//! Build command implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::bundler::{ChunkGraph, Compiler};
use crate::config::Config;
use crate::plugins::{ChunkManifestPlugin, PluginManager};
use crate::utils::{format_duration, format_size, relative_path};

/// Build a chunk graph and emit its assets
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Chunk graph description (JSON)
    #[arg(default_value = "chunks.json")]
    pub graph: PathBuf,

    /// Output directory, overrides `output.dir`
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Inline the manifest into the generated HTML page
    #[arg(long)]
    pub inline: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load_or_default(config_path)?;

        eprintln!("{} Building {}...", "→".blue(), self.graph.display());

        let mut session = BuildSession::new(config, self.into())?;
        let report = session.build()?;
        report.print(session.root());

        Ok(())
    }
}

/// Build options derived from command arguments
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub graph: PathBuf,
    pub outdir: Option<PathBuf>,
    pub inline: bool,
}

impl From<&BuildCommand> for BuildOptions {
    fn from(cmd: &BuildCommand) -> Self {
        Self {
            graph: cmd.graph.clone(),
            outdir: cmd.outdir.clone(),
            inline: cmd.inline,
        }
    }
}

/// A compiler with the manifest plugin applied, reused across builds
pub struct BuildSession {
    compiler: Compiler,
    plugin: Arc<ChunkManifestPlugin>,
    graph: PathBuf,
    out_dir: PathBuf,
    root: PathBuf,
}

impl BuildSession {
    pub fn new(mut config: Config, options: BuildOptions) -> Result<Self> {
        if options.inline {
            config.manifest.inline_manifest = true;
            config.output.html = true;
        }

        let out_dir = options.outdir.unwrap_or_else(|| config.output_dir());
        let mut compiler = Compiler::new(config.output_options(), config.host_api())
            .with_html(config.output.html);

        let plugin = Arc::new(ChunkManifestPlugin::new(config.manifest.clone()));
        let mut plugins = PluginManager::new();
        plugins.register(plugin.clone());
        plugins.apply(&mut compiler)?;

        Ok(Self {
            compiler,
            plugin,
            graph: options.graph,
            out_dir,
            root: config.root,
        })
    }

    /// Chunk graph file this session builds
    pub fn graph(&self) -> &Path {
        &self.graph
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the graph, run a compilation and write its assets
    pub fn build(&mut self) -> Result<BuildReport> {
        let start = Instant::now();

        let graph = ChunkGraph::load(&self.graph)?;
        let compilation = self.compiler.run(graph)?;
        let written = compilation
            .write_assets(&self.out_dir)
            .with_context(|| format!("Failed to write output to {}", self.out_dir.display()))?;

        let assets = written
            .into_iter()
            .zip(compilation.assets.values().map(String::len))
            .collect();

        Ok(BuildReport {
            assets,
            manifest_entries: self.plugin.manifest().len(),
            duration: start.elapsed(),
        })
    }
}

/// Summary of one build
#[derive(Debug)]
pub struct BuildReport {
    /// Written files with their sizes
    pub assets: Vec<(PathBuf, usize)>,

    /// Number of chunks in the manifest
    pub manifest_entries: usize,

    pub duration: Duration,
}

impl BuildReport {
    /// Print the summary to stderr
    pub fn print(&self, root: &Path) {
        eprintln!(
            "\n{} Built {} asset(s) in {}\n",
            "✓".green().bold(),
            self.assets.len(),
            format_duration(self.duration)
        );

        for (path, size) in &self.assets {
            let display = relative_path(root, path).unwrap_or_else(|| path.display().to_string());
            eprintln!(
                "  {} {} {}",
                "•".dimmed(),
                display.cyan(),
                format_size(*size).dimmed()
            );
        }

        eprintln!(
            "\n  {} {} chunk(s) in manifest\n",
            "•".dimmed(),
            self.manifest_entries
        );
    }
}
