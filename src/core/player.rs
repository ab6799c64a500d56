use crate::error::{RadioError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// A stream of text lines, consumed one at a time.
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator, or `None` once the stream is done.
    async fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Searches `PATH` for the player executable.
pub fn locate_player(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|source| RadioError::PlayerNotFound {
        player: name.to_string(),
        source,
    })
}

/// Line reader that tolerates invalid UTF-8 and treats `\n`, `\r\n` and a
/// bare `\r` as line breaks.
///
/// Safe to use inside `tokio::select!`: bytes read before a cancellation
/// stay buffered and are picked up by the next call.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    pending: VecDeque<String>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn split_chunk(&mut self) {
        let chunk = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();

        let chunk = chunk.strip_suffix('\n').unwrap_or(&chunk);
        let chunk = chunk.strip_suffix('\r').unwrap_or(chunk);
        self.pending.extend(chunk.split('\r').map(str::to_string));
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for LineReader<R> {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }

            let read = self.reader.read_until(b'\n', &mut self.buf).await?;
            if read == 0 && self.buf.is_empty() {
                return Ok(None);
            }
            self.split_chunk();
        }
    }
}

#[cfg(unix)]
type PipeSource = tokio::net::unix::pipe::Receiver;
#[cfg(not(unix))]
type PipeSource = tokio::fs::File;

/// The player's stdout and stderr, interleaved exactly as it wrote them.
pub type PlayerOutput = LineReader<PipeSource>;

#[cfg(unix)]
fn pipe_source(reader: io::PipeReader) -> io::Result<PipeSource> {
    tokio::net::unix::pipe::Receiver::from_owned_fd(std::os::fd::OwnedFd::from(reader))
}

#[cfg(not(unix))]
fn pipe_source(reader: io::PipeReader) -> io::Result<PipeSource> {
    let handle = std::os::windows::io::OwnedHandle::from(reader);
    Ok(tokio::fs::File::from_std(std::fs::File::from(handle)))
}

/// How long the player gets to exit after SIGTERM before it is killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// The running player. Killed if dropped while still alive.
pub struct PlayerProcess {
    name: String,
    child: Child,
    output: Option<PlayerOutput>,
}

impl PlayerProcess {
    /// Starts `program` with `stream_url` as its only argument. Its stdout
    /// and stderr share one pipe, so their relative order is preserved.
    pub fn spawn(program: &Path, stream_url: &str) -> Result<Self> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        let launch_error = |source| RadioError::Launch {
            player: name.clone(),
            source,
        };

        info!("Spawning {}: {}", program.display(), stream_url);

        let (reader, writer) = io::pipe().map_err(launch_error)?;
        let child = {
            let mut command = Command::new(program);
            command
                .arg(stream_url)
                .stdout(Stdio::from(writer.try_clone().map_err(launch_error)?))
                .stderr(Stdio::from(writer))
                .kill_on_drop(true);
            // Dropping `command` closes our copies of the write end, so the
            // reader sees EOF once the player is done with it.
            command.spawn().map_err(launch_error)?
        };
        let output = pipe_source(reader).map_err(launch_error)?;

        debug!("{} started with pid {:?}", name, child.id());

        Ok(Self {
            name,
            child,
            output: Some(LineReader::new(output)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hands out the merged output stream. Only available once.
    pub fn take_output(&mut self) -> Option<PlayerOutput> {
        self.output.take()
    }

    /// Asks the player to stop and reaps it. It gets SIGTERM first and is
    /// killed only if it outlives [`TERMINATE_GRACE`].
    pub async fn terminate(&mut self) -> Result<ExitStatus> {
        if self.request_stop() {
            match tokio::time::timeout(TERMINATE_GRACE, self.child.wait()).await {
                Ok(status) => return self.reaped(status),
                Err(_) => warn!("{} ignored SIGTERM, killing it", self.name),
            }
        }

        if let Err(e) = self.child.start_kill() {
            // Already exited; wait() below still reaps it.
            debug!("kill request for {} ignored: {}", self.name, e);
        }
        self.wait().await
    }

    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await;
        self.reaped(status)
    }

    fn reaped(&self, status: io::Result<ExitStatus>) -> Result<ExitStatus> {
        let status = status.map_err(RadioError::Wait)?;
        info!("{} exited with {}", self.name, status);
        Ok(status)
    }

    #[cfg(unix)]
    fn request_stop(&self) -> bool {
        let Some(pid) = self.child.id() else {
            return false;
        };
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };

        // SAFETY: `pid` is our child and has not been reaped, so it still
        // names that process.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            debug!("SIGTERM to {} failed: {}", self.name, io::Error::last_os_error());
        }
        rc == 0
    }

    #[cfg(not(unix))]
    fn request_stop(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    async fn collect<S: LineSource>(source: &mut S) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_line_reader_splits_on_all_breaks() {
        let mock = Builder::new()
            .read(b"first\nsecond\r\nstatus 1\rstatus 2\r")
            .read(b"\nlast without newline")
            .build();
        let mut reader = LineReader::new(mock);

        assert_eq!(
            collect(&mut reader).await,
            vec!["first", "second", "status 1", "status 2", "last without newline"]
        );
    }

    #[tokio::test]
    async fn test_line_reader_joins_split_reads() {
        let mock = Builder::new()
            .read(b" icy-ti")
            .read(b"tle: Artist - So")
            .read(b"ng\n")
            .build();
        let mut reader = LineReader::new(mock);

        assert_eq!(collect(&mut reader).await, vec![" icy-title: Artist - Song"]);
    }

    #[tokio::test]
    async fn test_line_reader_replaces_invalid_utf8() {
        let mock = Builder::new().read(b"icy-title: Caf\xe9\n").build();
        let mut reader = LineReader::new(mock);

        assert_eq!(collect(&mut reader).await, vec!["icy-title: Caf\u{FFFD}"]);
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_launch_error() {
        let err = match PlayerProcess::spawn(Path::new("/nonexistent/radio-player"), "http://example.com") {
            Ok(_) => panic!("spawn should fail"),
            Err(err) => err,
        };

        assert!(matches!(err, RadioError::Launch { ref player, .. } if player == "radio-player"));
        assert!(err.to_string().starts_with("Failed to start radio-player: "));
    }

    #[cfg(unix)]
    fn spawn_script(dir: &tempfile::TempDir, body: &str) -> PlayerProcess {
        let script = dir.path().join("player.sh");
        std::fs::write(&script, body).unwrap();
        let sh = locate_player("sh").unwrap();
        PlayerProcess::spawn(&sh, &script.display().to_string()).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_sends_sigterm_first() {
        use std::os::unix::process::ExitStatusExt;

        let dir = tempfile::tempdir().unwrap();
        let mut process = spawn_script(&dir, "exec sleep 30\n");

        let status = process.terminate().await.unwrap();
        assert_eq!(status.signal(), Some(libc::SIGTERM));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_kills_stubborn_player() {
        use std::os::unix::process::ExitStatusExt;

        let dir = tempfile::tempdir().unwrap();
        let mut process = spawn_script(&dir, "trap '' TERM\nwhile :; do sleep 1; done\n");
        // Give the shell time to install the trap.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = process.terminate().await.unwrap();
        assert_eq!(status.signal(), Some(libc::SIGKILL));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_and_stderr_share_one_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = spawn_script(&dir, "echo one\necho two 1>&2\necho three\necho four 1>&2\n");
        let mut output = process.take_output().unwrap();
        assert!(process.take_output().is_none());

        assert_eq!(collect(&mut output).await, vec!["one", "two", "three", "four"]);
        assert!(process.wait().await.unwrap().success());
    }

    #[test]
    fn test_locate_missing_player() {
        let err = locate_player("radio-logger-no-such-player").unwrap_err();
        assert!(matches!(err, RadioError::PlayerNotFound { .. }));
        assert!(err.to_string().contains("radio-logger-no-such-player"));
    }
}
