//! Camlayer CLI: lay out, compose, and record webcam overlays.
//!
//! Usage:
//!   camlayer check [--write-config]      Show configuration and capabilities
//!   camlayer layout <IMAGES>...          Print where overlays would be placed
//!   camlayer compose <IMAGES>... -o OUT  Render one composited frame to a PNG
//!   camlayer record <IMAGES>...          Record a session to video.webm

use std::path::PathBuf;

use camlayer_common::config::AppConfig;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "camlayer",
    about = "Webcam recording with draggable image overlays",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration and compiled-in capabilities
    Check {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write_config: bool,
    },

    /// Print the placement of each image on an empty surface
    Layout {
        /// Images in insertion order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Surface width (defaults to the configured surface)
        #[arg(long)]
        width: Option<u32>,

        /// Surface height (defaults to the configured surface)
        #[arg(long)]
        height: Option<u32>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Render one composited frame to a PNG
    Compose {
        /// Overlay images in insertion order
        images: Vec<PathBuf>,

        /// Image standing in for the camera frame
        #[arg(short, long)]
        background: Option<PathBuf>,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Move an overlay before rendering, as INDEX:X,Y (repeatable)
        #[arg(long = "move", value_name = "INDEX:X,Y")]
        moves: Vec<String>,

        /// Surface width (defaults to the configured surface)
        #[arg(long)]
        width: Option<u32>,

        /// Surface height (defaults to the configured surface)
        #[arg(long)]
        height: Option<u32>,
    },

    /// Record a session with overlays and save video.webm
    Record {
        /// Overlay images added once recording starts
        images: Vec<PathBuf>,

        /// Recording length in seconds (Ctrl+C stops early)
        #[arg(short, long, default_value = "5.0")]
        duration: f64,

        /// Microphone gain (defaults to the configured gain)
        #[arg(long)]
        gain: Option<f32>,

        /// Use the built-in test pattern and tone instead of devices
        #[arg(long)]
        synthetic: bool,

        /// Download directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    camlayer_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Check { write_config } => commands::check::run(&config, write_config),
        Commands::Layout {
            images,
            width,
            height,
            json,
        } => commands::layout::run(&config, images, width, height, json),
        Commands::Compose {
            images,
            background,
            output,
            moves,
            width,
            height,
        } => commands::compose::run(&config, images, background, output, moves, width, height),
        Commands::Record {
            images,
            duration,
            gain,
            synthetic,
            output,
        } => commands::record::run(config, images, duration, gain, synthetic, output).await,
    }
}
