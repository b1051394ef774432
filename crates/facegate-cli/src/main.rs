use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facegate_core::DatasetStore;
use facegate_hw::Camera;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod flows;
mod font;
mod hardware;
mod menu;
mod overlay;
mod preview;

use config::Config;
use hardware::Hardware;
use menu::CameraFlows;

#[derive(Parser)]
#[command(name = "facegate", about = "Enroll, recognize and delete faces with a webcam")]
struct Cli {
    /// Dataset file (overrides FACEGATE_DATASET_PATH)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// V4L2 camera device (overrides FACEGATE_CAMERA_DEVICE)
    #[arg(long)]
    device: Option<String>,

    /// Run one action instead of the interactive menu
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a face by capturing ten poses
    Add {
        /// Display name for the new face
        name: String,
    },
    /// Recognize faces from the live camera until Esc
    Recognize,
    /// Delete an enrolled face
    Delete {
        /// 1-based number from `list`; prompts when omitted
        #[arg(allow_negative_numbers = true)]
        number: Option<i64>,
    },
    /// List enrolled names
    List,
    /// List V4L2 capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(path) = cli.dataset {
        config.dataset_path = path;
    }
    if let Some(device) = cli.device {
        config.camera_device = device;
    }
    tracing::debug!(?config, "configuration loaded");

    if let Some(Commands::Devices) = cli.command {
        for dev in Camera::list_devices() {
            println!("{}\t{} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
        }
        return Ok(());
    }

    let mut store = DatasetStore::open(&config.dataset_path)
        .with_context(|| format!("failed to open dataset {}", config.dataset_path.display()))?;
    let mut hardware = Hardware::new(config);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        None => menu::run(&mut store, &mut hardware, &mut input, &mut out)?,
        Some(Commands::Add { name }) => hardware.enroll(&name, &mut store, &mut out)?,
        Some(Commands::Recognize) => hardware.recognize(&store, &mut out)?,
        Some(Commands::Delete { number: Some(number) }) => {
            flows::delete_number(&mut store, number, &mut out)?;
        }
        Some(Commands::Delete { number: None }) => {
            flows::delete(&mut store, &mut input, &mut out)?;
        }
        Some(Commands::List) => flows::list_names(&store, &mut out)?,
        Some(Commands::Devices) => {}
    }

    Ok(())
}
