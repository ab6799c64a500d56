use crate::config::Config;
use crate::core::logger::{ensure_parent_dir, open_log, DrainOutcome, MetadataLogger};
use crate::core::player::{locate_player, PlayerProcess};
use crate::error::{RadioError, Result};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::{ExitCode, ExitStatus};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The player closed its output and exited on its own.
    Finished(ExitStatus),
    /// The operator asked us to stop; the player was terminated.
    Interrupted,
}

impl RunOutcome {
    /// Process exit code for this outcome. A player that failed passes its
    /// own code through; one killed by a signal maps to 1.
    pub fn code(&self) -> u8 {
        match self {
            RunOutcome::Interrupted => 0,
            RunOutcome::Finished(status) if status.success() => 0,
            RunOutcome::Finished(status) => status
                .code()
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .unwrap_or(1),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Owns one player run, from launch to reaping.
pub struct Supervisor {
    config: Config,
    player: PathBuf,
}

impl Supervisor {
    /// Fails fast when the player is not on `PATH`. Nothing is written to
    /// disk at this point.
    pub fn locate(config: Config) -> Result<Self> {
        let player = locate_player(&config.player)?;
        info!("Using {} at {}", config.player, player.display());
        Ok(Self::new(config, player))
    }

    /// Supervises the executable at `player` without searching `PATH`.
    pub fn new(config: Config, player: PathBuf) -> Self {
        Self { config, player }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plays the stream and logs titles until the player exits or
    /// `shutdown` resolves. A player that closes its output but keeps
    /// running can still be stopped through `shutdown`.
    pub async fn run<F>(&self, shutdown: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let log_path = &self.config.log_path;
        ensure_parent_dir(log_path).await?;

        let mut process = PlayerProcess::spawn(&self.player, &self.config.stream_url)?;

        let log = match open_log(log_path).await {
            Ok(log) => log,
            Err(e) => {
                process.terminate().await?;
                return Err(e);
            }
        };

        let mut output = process.take_output().ok_or_else(|| {
            RadioError::Output(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "player output is not captured",
            ))
        })?;

        tokio::pin!(shutdown);
        let mut logger = MetadataLogger::new(log);
        let drained = logger.drain(&mut output, &mut shutdown).await;
        let entries = logger.entries();
        let closed = logger.close().await;

        let outcome = match drained {
            Ok(DrainOutcome::EndOfStream) => {
                let exited = tokio::select! {
                    biased;
                    _ = &mut shutdown => None,
                    status = process.wait() => Some(status?),
                };
                match exited {
                    Some(status) => RunOutcome::Finished(status),
                    None => {
                        info!("Shutdown requested while waiting for {}", process.name());
                        process.terminate().await?;
                        RunOutcome::Interrupted
                    }
                }
            }
            Ok(DrainOutcome::Interrupted) => {
                process.terminate().await?;
                RunOutcome::Interrupted
            }
            Err(e) => {
                warn!("Stopping {} after error: {}", process.name(), e);
                process.terminate().await?;
                return Err(e);
            }
        };
        closed?;

        info!("Run finished with {} titles logged: {:?}", entries, outcome);
        Ok(outcome)
    }
}
