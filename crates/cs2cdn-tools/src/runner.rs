//! External command execution
//!
//! Two modes are supported:
//! - captured: stdout and stderr are collected as text, optionally under a
//!   deadline;
//! - streamed: each output line is forwarded to an [`OutputSink`] as it
//!   arrives, from one reader task per stream.
//!
//! Both reader tasks are joined before a result is reported so trailing
//! output is never lost.

use crate::error::RunError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// How long capture readers may keep draining after a timed-out process
/// has been killed
const DRAIN_GRACE: Duration = Duration::from_millis(500);

type SharedBuf = Arc<Mutex<Vec<u8>>>;

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program path
    pub program: PathBuf,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
}

impl Invocation {
    /// Create an invocation without arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> RunError {
        RunError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured process output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// Which output stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Receiver for streamed process output lines.
///
/// Called concurrently from the stdout and stderr reader tasks.
pub trait OutputSink: Send + Sync {
    /// Handle one line, without its terminator
    fn line(&self, stream: OutputStream, line: &str);
}

/// Sink that logs every line at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, stream: OutputStream, line: &str) {
        info!("[{stream}] {line}");
    }
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output.
    ///
    /// With a deadline, the process is killed once it elapses and
    /// [`RunError::Timeout`] is returned. A nonzero exit yields
    /// [`RunError::Failed`]. Both carry the output captured so far.
    async fn run(
        &self,
        invocation: &Invocation,
        deadline: Option<Duration>,
    ) -> Result<CommandOutput, RunError>;

    /// Run to completion, forwarding output lines to `sink` as they arrive.
    async fn stream(
        &self,
        invocation: &Invocation,
        sink: Arc<dyn OutputSink>,
    ) -> Result<(), RunError>;

    /// Run to completion with stdout written to `dest`. Stderr is logged.
    async fn run_to_file(&self, invocation: &Invocation, dest: &Path) -> Result<(), RunError>;
}

#[async_trait]
impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    async fn run(
        &self,
        invocation: &Invocation,
        deadline: Option<Duration>,
    ) -> Result<CommandOutput, RunError> {
        (**self).run(invocation, deadline).await
    }

    async fn stream(
        &self,
        invocation: &Invocation,
        sink: Arc<dyn OutputSink>,
    ) -> Result<(), RunError> {
        (**self).stream(invocation, sink).await
    }

    async fn run_to_file(&self, invocation: &Invocation, dest: &Path) -> Result<(), RunError> {
        (**self).run_to_file(invocation, dest).await
    }
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        deadline: Option<Duration>,
    ) -> Result<CommandOutput, RunError> {
        info!("Executing command: {invocation}");

        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| invocation.spawn_error(source))?;

        let stdout_buf = SharedBuf::default();
        let stderr_buf = SharedBuf::default();
        let mut stdout = tokio::spawn(read_pipe(child.stdout.take(), Arc::clone(&stdout_buf)));
        let mut stderr = tokio::spawn(read_pipe(child.stderr.take(), Arc::clone(&stderr_buf)));

        let waited = match deadline {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        // Descendants of a killed process may still hold the pipes open.
        let grace = if waited.is_none() {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out command {invocation}: {e}");
            }
            Some(DRAIN_GRACE)
        } else {
            None
        };

        let output = CommandOutput {
            stdout: drain(&mut stdout, &stdout_buf, grace, OutputStream::Stdout).await,
            stderr: drain(&mut stderr, &stderr_buf, grace, OutputStream::Stderr).await,
        };
        if !output.stdout.is_empty() {
            debug!("Command stdout: {}", output.stdout);
        }
        if !output.stderr.is_empty() {
            debug!("Command stderr: {}", output.stderr);
        }

        let command = invocation.to_string();
        match waited {
            None => Err(RunError::Timeout {
                command,
                deadline: deadline.unwrap_or_default(),
                output,
            }),
            Some(Err(source)) => Err(RunError::Wait { command, source }),
            Some(Ok(status)) if !status.success() => Err(RunError::Failed {
                command,
                status,
                output,
            }),
            Some(Ok(_)) => Ok(output),
        }
    }

    async fn stream(
        &self,
        invocation: &Invocation,
        sink: Arc<dyn OutputSink>,
    ) -> Result<(), RunError> {
        info!("Executing command: {invocation}");

        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| invocation.spawn_error(source))?;

        let stdout = tokio::spawn(forward_lines(
            child.stdout.take(),
            OutputStream::Stdout,
            Arc::clone(&sink),
        ));
        let stderr = tokio::spawn(forward_lines(
            child.stderr.take(),
            OutputStream::Stderr,
            sink,
        ));

        let waited = child.wait().await;
        let (stdout, stderr) = tokio::join!(stdout, stderr);
        log_reader_exit(OutputStream::Stdout, stdout);
        log_reader_exit(OutputStream::Stderr, stderr);

        check_status(invocation, waited)
    }

    async fn run_to_file(&self, invocation: &Invocation, dest: &Path) -> Result<(), RunError> {
        info!("Executing command: {invocation} > {}", dest.display());

        let file = std::fs::File::create(dest).map_err(|source| RunError::OutputFile {
            path: dest.to_path_buf(),
            source,
        })?;

        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| invocation.spawn_error(source))?;

        let stderr = tokio::spawn(forward_lines(
            child.stderr.take(),
            OutputStream::Stderr,
            Arc::new(TracingSink),
        ));

        let waited = child.wait().await;
        log_reader_exit(OutputStream::Stderr, stderr.await);

        check_status(invocation, waited)
    }
}

fn check_status(
    invocation: &Invocation,
    waited: std::io::Result<std::process::ExitStatus>,
) -> Result<(), RunError> {
    let command = invocation.to_string();
    match waited {
        Err(source) => Err(RunError::Wait { command, source }),
        Ok(status) if !status.success() => Err(RunError::Failed {
            command,
            status,
            output: CommandOutput::default(),
        }),
        Ok(_) => Ok(()),
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>, buf: SharedBuf) {
    let Some(mut pipe) = pipe else {
        return;
    };

    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => lock(&buf).extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!("Stopped reading process output: {e}");
                break;
            }
        }
    }
}

/// Wait for a capture reader, at most `grace` if given, and return what it
/// collected. A reader still running after `grace` is aborted.
async fn drain(
    reader: &mut JoinHandle<()>,
    buf: &SharedBuf,
    grace: Option<Duration>,
    stream: OutputStream,
) -> String {
    let joined = match grace {
        Some(grace) => match tokio::time::timeout(grace, &mut *reader).await {
            Ok(joined) => joined,
            Err(_) => {
                debug!("Abandoning {stream} reader, pipe still held open");
                reader.abort();
                Ok(())
            }
        },
        None => (&mut *reader).await,
    };
    log_reader_exit(stream, joined);

    String::from_utf8_lossy(&lock(buf)).into_owned()
}

fn lock(buf: &SharedBuf) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_reader_exit(stream: OutputStream, joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!("{stream} reader ended abnormally, output may be incomplete: {e}");
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    stream: OutputStream,
    sink: Arc<dyn OutputSink>,
) {
    let Some(pipe) = pipe else {
        return;
    };

    let mut segments = BufReader::new(pipe).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(segment)) => {
                let line = String::from_utf8_lossy(&segment);
                sink.line(stream, line.trim_end_matches('\r'));
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading {stream}: {e}");
                break;
            }
        }
    }
}
