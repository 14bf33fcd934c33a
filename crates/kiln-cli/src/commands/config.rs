//! Configuration commands

use anyhow::{Context, Result};
use clap::Subcommand;
use kiln_editor::EditorConfig;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved configuration as TOML
    Show {
        /// Explicit config file layered over global and project config
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// List the config layers in precedence order and whether each exists
    Paths,
}

pub fn run(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show { path } => show(path),
        ConfigCommands::Paths => paths(),
    }
}

fn show(path: Option<PathBuf>) -> Result<()> {
    let config = EditorConfig::load(path.as_deref()).context("Failed to load config")?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn paths() -> Result<()> {
    let mut layers = Vec::new();
    if let Some(global) = EditorConfig::global_config_path() {
        layers.push(("global", global));
    }
    layers.push(("project", EditorConfig::project_config_path()));

    for (label, path) in layers {
        let state = if path.exists() { "found" } else { "missing" };
        println!("{:8} {} ({})", label, path.display(), state);
    }
    Ok(())
}
