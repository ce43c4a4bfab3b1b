//! Watch command implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::build::{BuildOptions, BuildSession};
use crate::config::Config;

/// Rebuild whenever the chunk graph changes
#[derive(Args, Debug)]
pub struct WatchCommand {
    /// Chunk graph description (JSON)
    #[arg(default_value = "chunks.json")]
    pub graph: PathBuf,

    /// Output directory, overrides `output.dir`
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Debounce delay in milliseconds
    #[arg(long, default_value = "100")]
    pub debounce: u64,
}

impl WatchCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        info!("Loading configuration from {}", config_path);
        let config = Config::load_or_default(config_path)?;

        let graph = std::env::current_dir()?.join(&self.graph);
        let mut session = BuildSession::new(
            config,
            BuildOptions {
                graph: graph.clone(),
                outdir: self.outdir.clone(),
                inline: false,
            },
        )?;

        rebuild(&mut session);

        let mut changes = watch_file(&graph, Duration::from_millis(self.debounce))?;

        eprintln!(
            "{} Watching {} for changes, press {} to stop\n",
            "→".blue(),
            self.graph.display().to_string().cyan(),
            "Ctrl+C".yellow()
        );

        loop {
            tokio::select! {
                changed = changes.recv() => match changed {
                    Some(path) => {
                        eprintln!("  {} {} changed", "↻".yellow(), path.display());
                        rebuild(&mut session);
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    eprintln!();
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Run one build, reporting failures without leaving the watch loop
fn rebuild(session: &mut BuildSession) {
    match session.build() {
        Ok(report) => report.print(session.root()),
        Err(e) => {
            error!("Build failed: {:#}", e);
            eprintln!("  {} {:#}", "✗".red().bold(), e);
        }
    }
}

/// Watch a single file and forward debounced changes to the async side
fn watch_file(path: &Path, delay: Duration) -> Result<mpsc::UnboundedReceiver<PathBuf>> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .with_context(|| format!("Not a file: {}", path.display()))?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(delay, tx)?;
    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    let (changed_tx, changed_rx) = mpsc::unbounded_channel();

    // The debouncer is moved into the thread to keep it alive
    std::thread::spawn(move || {
        let _debouncer = debouncer;

        loop {
            match rx.recv() {
                Ok(Ok(events)) => {
                    let Some(event) = events
                        .into_iter()
                        .find(|event| event.path.file_name() == Some(file_name.as_os_str()))
                    else {
                        continue;
                    };

                    debug!("Change detected: {}", event.path.display());
                    if changed_tx.send(event.path).is_err() {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    error!("Watch error: {:?}", e);
                }
                Err(_) => break,
            }
        }
    });

    Ok(changed_rx)
}
