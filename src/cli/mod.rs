use crate::config::{Config, ConfigDefaults};
use crate::core::{RunOutcome, Supervisor};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "radio-logger")]
#[command(about = "Play a radio stream with mpv and log the song titles")]
#[command(version)]
pub struct Cli {
    /// The streaming URL (e.g. a Zeno FM link)
    /// [default: the built-in KJ Yesudas Radio stream]
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Path to the log file that receives the timestamps and titles
    /// [default: ~/yesudas-radio-log.txt]
    #[arg(short, long, value_name = "PATH")]
    pub log: Option<PathBuf>,
}

impl Cli {
    /// Merges the parsed flags with `defaults`.
    pub fn config(&self, defaults: &ConfigDefaults) -> Config {
        Config::resolve(self.url.clone(), self.log.clone(), defaults)
    }

    pub async fn run(&self) -> Result<ExitCode> {
        let config = self.config(&ConfigDefaults::default());
        let supervisor = Supervisor::locate(config)?;
        let config = supervisor.config();

        println!("🎵 Now playing: {}", config.station_name);
        println!("📝 Logging songs to: {}\n", config.log_path.display());

        let outcome = supervisor.run(interrupted()).await?;

        match outcome {
            RunOutcome::Interrupted => println!("\n⏹  Stopping..."),
            RunOutcome::Finished(status) => {
                println!("\n🛑 {} finished ({}), exiting.", config.player, status)
            }
        }

        Ok(outcome.exit_code())
    }
}

/// Resolves on the first Ctrl+C. If the handler cannot be installed the
/// run simply continues until the player exits.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
