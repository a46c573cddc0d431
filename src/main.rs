// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qr_mirror::app::NavigationShell;
use qr_mirror::config::Config;
use qr_mirror::constants::app_info;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "qr-mirror")]
#[command(about = "Terminal QR code scanner and magnifier")]
#[command(version = app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List,

    /// Encode text as a QR image without scanning
    Encode {
        /// Text payload to encode
        text: String,

        /// Output file path (default: ./QR_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qr_mirror=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => cli::list_devices(),
        Some(Commands::Encode { text, output }) => cli::encode_file(&text, output),
        None => NavigationShell::run(Config::load()),
    }
}
