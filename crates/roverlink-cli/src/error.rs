//! Error types for the roverlink CLI.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced to the operator.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("config file parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("link error: {0}")]
    Link(#[from] roverlink_core::LinkError),

    #[error("bluetooth error: {0}")]
    Ble(#[from] roverlink_ble::BleLinkError),

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl From<roverlink_core::InvalidCommandName> for CliError {
    fn from(error: roverlink_core::InvalidCommandName) -> Self {
        CliError::InvalidCommand(error.to_string())
    }
}
