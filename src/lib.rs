pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use config::{Config, ConfigDefaults};
pub use core::{LogEntry, MetadataLogger, RunOutcome, Supervisor};
pub use error::RadioError;
