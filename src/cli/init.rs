//! Project initialization command

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

const CONFIG_FILE: &str = "chunk-manifest.toml";
const GRAPH_FILE: &str = "chunks.json";

/// Scaffold a configuration and a sample chunk graph
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Project directory
    #[arg(default_value = ".")]
    pub name: String,

    /// Inline the manifest into the generated HTML page
    #[arg(long)]
    pub inline: bool,

    /// Overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(&self) -> Result<()> {
        let project_dir = Path::new(&self.name);

        eprintln!("{} Initializing chunk manifest project...\n", "→".blue());

        if self.name != "." {
            fs::create_dir_all(project_dir).context("Failed to create project directory")?;
        }

        self.write(project_dir, CONFIG_FILE, &self.generate_config())?;
        self.write(project_dir, GRAPH_FILE, SAMPLE_GRAPH)?;

        eprintln!("\n{} Project initialized successfully!\n", "✓".green().bold());

        eprintln!("  Next steps:");
        if self.name != "." {
            eprintln!("    {} cd {}", "→".dimmed(), self.name.cyan());
        }
        eprintln!("    {} chunk-manifest build", "→".dimmed());
        eprintln!();

        Ok(())
    }

    fn write(&self, dir: &Path, name: &str, content: &str) -> Result<()> {
        let path = dir.join(name);
        if path.exists() && !self.force {
            bail!("{} already exists, use --force to overwrite", path.display());
        }

        fs::write(&path, content).with_context(|| format!("Failed to write {}", name))?;
        eprintln!("  {} Created {}", "✓".green(), name.cyan());
        Ok(())
    }

    fn generate_config(&self) -> String {
        format!(
            r#"# Chunk manifest configuration

[manifest]
filename = "manifest.json"
manifest_variable = "webpackManifest"
inline_manifest = {inline}
output_format = "json"
key_by = "id"

[output]
dir = "dist"
filename = "[name].[chunkhash].js"
chunk_filename = "[name].[chunkhash].js"
public_path = "/"
html = {inline}
hooks = "modern"
"#,
            inline = self.inline,
        )
    }
}

const SAMPLE_GRAPH: &str = r#"{
  "chunks": [
    {
      "id": "main",
      "name": "main",
      "entry": true,
      "source": "window.__webpack_require__.e('settings');",
      "children": ["settings"]
    },
    {
      "id": "settings",
      "name": "settings",
      "source": "console.log('settings');",
      "children": ["editor"]
    },
    {
      "id": "editor",
      "name": "editor",
      "source": "console.log('editor');"
    }
  ]
}
"#;
