//! roverlink binary entry point.

mod app;
mod cli;
mod config;
mod error;

use clap::Parser;
use tracing::Level;

use crate::app::App;
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::Result;

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(profile) = cli.profile {
        config.ble.profile = profile.to_profile();
    }

    let read_only = matches!(cli.command, Commands::Monitor);
    let app = App::start(config.scheduler, config.ble, read_only).await?;
    app.run().await
}
