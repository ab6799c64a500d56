use crate::core::metadata::{extract_title, LogEntry};
use crate::core::player::LineSource;
use crate::error::{RadioError, Result};
use std::future::Future;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

fn log_error(path: &Path) -> impl FnOnce(std::io::Error) -> RadioError + '_ {
    move |source| RadioError::LogFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Creates the directories leading up to `path`. A no-op when they exist.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(log_error(path))?;
    }
    Ok(())
}

/// Opens the title log for appending, creating it and its parent
/// directories when missing. Existing entries are never touched.
pub async fn open_log(path: &Path) -> Result<File> {
    ensure_parent_dir(path).await?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(log_error(path))?;

    info!("Appending titles to {}", path.display());
    Ok(file)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    EndOfStream,
    Interrupted,
}

/// Turns marker lines into timestamped log entries.
pub struct MetadataLogger<W> {
    sink: W,
    echo: bool,
    entries: usize,
}

impl<W: AsyncWrite + Unpin + Send> MetadataLogger<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            echo: true,
            entries: 0,
        }
    }

    /// Controls the console notification printed for every title.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Records `line` if it carries a title. Each entry is written as one
    /// line and flushed before returning.
    pub async fn observe(&mut self, line: &str) -> Result<Option<LogEntry>> {
        let Some(title) = extract_title(line) else {
            return Ok(None);
        };

        let entry = LogEntry::now(title);
        let serialized = format!("{}\n", entry);
        self.sink
            .write_all(serialized.as_bytes())
            .await
            .map_err(RadioError::LogWrite)?;
        self.sink.flush().await.map_err(RadioError::LogWrite)?;
        self.entries += 1;

        debug!("Logged title #{}: {:?}", self.entries, entry.title);
        if self.echo {
            println!("🎶 {}", entry.title);
        }

        Ok(Some(entry))
    }

    /// Feeds every line of `source` through [`observe`](Self::observe)
    /// until the stream ends or `shutdown` resolves.
    ///
    /// `shutdown` is only raced against the read, never against a write.
    pub async fn drain<S, F>(&mut self, source: &mut S, shutdown: F) -> Result<DrainOutcome>
    where
        S: LineSource + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested after {} titles", self.entries);
                    return Ok(DrainOutcome::Interrupted);
                }
                line = source.next_line() => line.map_err(RadioError::Output)?,
            };

            match line {
                Some(line) => {
                    self.observe(&line).await?;
                }
                None => {
                    info!("Player output closed after {} titles", self.entries);
                    return Ok(DrainOutcome::EndOfStream);
                }
            }
        }
    }

    /// Flushes and releases the sink.
    pub async fn close(mut self) -> Result<W> {
        self.sink.flush().await.map_err(RadioError::LogWrite)?;
        Ok(self.sink)
    }
}
