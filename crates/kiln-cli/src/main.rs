//! Kiln CLI - headless front end for the Kiln editor core

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, run, scene};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Inspect, validate and drive Kiln scenes without a window", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scene file operations
    #[command(subcommand)]
    Scene(scene::SceneCommands),

    /// Run the editor loop headlessly over a scene
    Run {
        /// Path to scene file
        scene: PathBuf,

        /// Number of frames to simulate
        #[arg(long, default_value = "60")]
        frames: u64,

        /// Frames per second used for the fixed time step
        #[arg(long, default_value = "60")]
        fps: f32,

        /// Explicit config file layered over global and project config
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Configuration operations
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scene(cmd) => scene::run(cmd),
        Commands::Run {
            scene,
            frames,
            fps,
            config,
        } => run::run(run::RunArgs {
            scene,
            frames,
            fps,
            config,
        }),
        Commands::Config(cmd) => config::run(cmd),
    }
}
