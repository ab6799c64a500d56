use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("{player} was not found in your PATH. Install it first.")]
    PlayerNotFound {
        player: String,
        #[source]
        source: which::Error,
    },

    #[error("Failed to start {player}: {source}")]
    Launch {
        player: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write log entry: {0}")]
    LogWrite(#[source] io::Error),

    #[error("Failed to read player output: {0}")]
    Output(#[source] io::Error),

    #[error("Failed to wait for player: {0}")]
    Wait(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, RadioError>;
