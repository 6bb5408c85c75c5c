//! One analyzer process and the line protocol spoken with it.
//!
//! The analyzer is started with the source file as its last argument. It prints
//! arbitrary lines while loading and then a line containing `Ready`. After that, every
//! request is two lines (declarations, query) and every reply is exactly one line.

use crate::error::{HarnessError, Result};
use crate::types::NO_ANSWER;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

/// Substring that marks the end of the analyzer's loading phase.
pub const READY_MARKER: &str = "Ready";

/// How long the analyzer may take to load a source file.
pub const PREPARATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Line(String),
    /// The analyzer exited or closed its pipes before replying.
    BrokenChannel,
}

impl Answer {
    pub fn into_text(self) -> String {
        match self {
            Answer::Line(line) => line,
            Answer::BrokenChannel => NO_ANSWER.to_string(),
        }
    }
}

/// Starts a ready-to-query session for one source file.
#[allow(async_fn_in_trait)]
pub trait Launcher {
    type Session: Session;

    async fn start(&self, source: &Path) -> Result<Self::Session>;
}

#[allow(async_fn_in_trait)]
pub trait Session {
    /// Sends one request and waits for its single-line reply.
    async fn ask(&mut self, declarations: &str, query: &str) -> Answer;

    /// Stops the analyzer. Safe to call more than once.
    async fn close(&mut self);
}

/// How to invoke the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub preparation_timeout: Duration,
}

impl AnalyzerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            preparation_timeout: PREPARATION_TIMEOUT,
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Launcher for AnalyzerCommand {
    type Session = ProcessSession;

    async fn start(&self, source: &Path) -> Result<Self::Session> {
        ProcessSession::start(self, source).await
    }
}

/// A running analyzer that has reported `Ready`.
pub struct ProcessSession {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    source: PathBuf,
    closed: bool,
}

impl ProcessSession {
    /// Spawns the analyzer and waits for its ready marker. On any handshake failure the
    /// process is killed before the error is returned.
    pub async fn start(command: &AnalyzerCommand, source: &Path) -> Result<Self> {
        let deadline = handshake_deadline(Instant::now(), command.preparation_timeout);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .arg(source)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| HarnessError::Spawn {
            command: command.display(),
            source: e,
        })?;
        debug!(pid = ?child.id(), source = %source.display(), "analyzer started");

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr));
        }

        let mut session = Self {
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
            source: source.to_path_buf(),
            closed: false,
        };
        if let Err(e) = session.handshake(deadline, command.preparation_timeout).await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    async fn handshake(&mut self, deadline: Instant, timeout: Duration) -> Result<()> {
        loop {
            match timeout_at(deadline, read_line_lossy(&mut self.stdout)).await {
                Err(_) => {
                    return Err(HarnessError::PreparationTimeout {
                        source_file: self.source.clone(),
                        timeout,
                    });
                }
                Ok(Ok(None)) => {
                    return Err(HarnessError::PreparationCrash {
                        source_file: self.source.clone(),
                    });
                }
                Ok(Ok(Some(line))) if line.contains(READY_MARKER) => {
                    debug!(source = %self.source.display(), "analyzer ready");
                    return Ok(());
                }
                Ok(Ok(Some(line))) => debug!(line = %line, "discarded before ready"),
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn send(&mut self, declarations: &str, query: &str) -> io::Result<()> {
        self.stdin.write_all(declarations.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.write_all(query.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }
}

impl Session for ProcessSession {
    async fn ask(&mut self, declarations: &str, query: &str) -> Answer {
        if self.closed {
            return Answer::BrokenChannel;
        }
        if let Err(e) = self.send(declarations, query).await {
            debug!(error = %e, "request not delivered");
            return Answer::BrokenChannel;
        }
        match read_line_lossy(&mut self.stdout).await {
            Ok(Some(line)) => {
                debug!(query, answer = %line, "answered");
                Answer::Line(line)
            }
            Ok(None) => {
                debug!(query, "analyzer closed its output");
                Answer::BrokenChannel
            }
            Err(e) => {
                debug!(error = %e, "reply not readable");
                Answer::BrokenChannel
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Already exited is fine, both calls just report it.
        let _ = self.child.start_kill();
        match self.child.wait().await {
            Ok(status) => debug!(%status, "analyzer stopped"),
            Err(e) => debug!(error = %e, "analyzer status unavailable"),
        }
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.start_kill();
        }
    }
}

/// Timeouts too large for the clock saturate at roughly thirty years.
fn handshake_deadline(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}

fn missing_pipe(name: &str) -> HarnessError {
    HarnessError::Io(io::Error::other(format!("analyzer {name} was not captured")))
}

/// Reads one line without its terminator. Bytes that are not UTF-8 are replaced rather
/// than rejected; `None` means end of stream.
async fn read_line_lossy<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

async fn drain_stderr<R: AsyncRead + Unpin>(stderr: R) {
    let mut reader = BufReader::new(stderr);
    while let Ok(Some(line)) = read_line_lossy(&mut reader).await {
        debug!(target: "query_harness::analyzer", "{line}");
    }
}
