//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use roverlink_ble::SerialProfile;

/// Teleoperation front-end for a roverlink robot.
#[derive(Parser, Debug)]
#[command(
    name = "roverlink",
    version,
    about = "Drive a robot over a BLE serial link"
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial profile to scan for
    #[arg(long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the robot interactively from stdin
    Teleop,
    /// Connect and print text received from the robot
    Monitor,
}

/// Selectable serial profiles.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ProfileArg {
    /// RedBearLab BLE Mini serial service
    Redbear,
    /// Nordic UART service
    Nordic,
}

impl ProfileArg {
    pub fn to_profile(self) -> SerialProfile {
        match self {
            ProfileArg::Redbear => SerialProfile::redbear(),
            ProfileArg::Nordic => SerialProfile::nordic_uart(),
        }
    }
}
