// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use document_capture::backends::camera::{FacingMode, VideoResolution};
use document_capture::backends::virtual_camera::DeviceProfile;
use document_capture::frame_processor::Scenario;
use std::time::Duration;

mod cli;

#[derive(Parser)]
#[command(name = "document-capture")]
#[command(about = "Document capture core driven by a simulated camera platform")]
#[command(version = document_capture::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the cameras of a device profile
    List {
        /// Device profile (iphone15, samsung-s21fe, desktop)
        #[arg(short, long, default_value = "iphone15")]
        profile: DeviceProfile,
    },

    /// Pick the best camera for a facing mode
    Select {
        /// Device profile (iphone15, samsung-s21fe, desktop)
        #[arg(short, long, default_value = "iphone15")]
        profile: DeviceProfile,

        /// Requested facing (front, back); defaults to the configured one
        #[arg(short, long)]
        facing: Option<FacingMode>,

        /// Stream resolution (HD, FHD, UHD); defaults to the configured one
        #[arg(short, long)]
        resolution: Option<VideoResolution>,
    },

    /// Run a scripted scanning session
    Simulate {
        /// Scenario (two-sided, single-side, timeout, unsupported)
        #[arg(short, long, default_value = "two-sided")]
        scenario: Scenario,

        /// Device profile (iphone15, samsung-s21fe, desktop)
        #[arg(short, long, default_value = "iphone15")]
        profile: DeviceProfile,

        /// Scan timeout in milliseconds; defaults to the configured one
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Give up waiting for a result after this many seconds
        #[arg(short, long, default_value = "30")]
        deadline: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control the log level, e.g. RUST_LOG=document_capture=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { profile } => cli::list_cameras(profile),
        Commands::Select {
            profile,
            facing,
            resolution,
        } => cli::select_camera(profile, facing, resolution),
        Commands::Simulate {
            scenario,
            profile,
            timeout_ms,
            deadline,
        } => cli::simulate(
            scenario,
            profile,
            timeout_ms.map(Duration::from_millis),
            Duration::from_secs(deadline),
        ),
    }
}
