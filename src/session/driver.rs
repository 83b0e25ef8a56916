//! Session driver for the program under test
//!
//! Owns one subprocess and its stdin/stdout for its whole lifetime:
//! commands go in one line at a time and each response chunk is read
//! before the next command is written.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use crate::common::{paths, Config, Error, Result};
use crate::protocol::{EXIT, PROMPT};

use super::framing;

/// How to launch and talk to the program under test
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Executable to launch
    pub program: PathBuf,
    /// Launch arguments
    pub args: Vec<String>,
    /// Working directory for the program (inherited when unset)
    pub working_dir: Option<PathBuf>,
    /// Prompt token that delimits response chunks
    pub prompt: String,
    /// Bound on waiting for one response chunk
    pub response_timeout: Duration,
    /// Bound on waiting for the program to exit once its input is closed
    pub exit_timeout: Duration,
}

impl SessionOptions {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            prompt: PROMPT.to_string(),
            response_timeout: Duration::from_secs(10),
            exit_timeout: Duration::from_secs(5),
        }
    }

    /// Build options from the loaded configuration
    ///
    /// Relative program paths are resolved against the current directory.
    pub fn from_config(config: &Config) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            program: paths::resolve_program(&config.program.path, &cwd),
            args: config.program.args.clone(),
            working_dir: None,
            prompt: config.protocol.prompt.clone(),
            response_timeout: Duration::from_secs(config.timeouts.response_secs),
            exit_timeout: Duration::from_secs(config.timeouts.exit_secs),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_exit_timeout(mut self, timeout: Duration) -> Self {
        self.exit_timeout = timeout;
        self
    }
}

/// One running instance of the program under test
pub struct Session {
    /// Program path, for diagnostics
    program: PathBuf,
    /// Program subprocess
    child: Child,
    /// Buffered writer for program stdin (None once closed)
    stdin: Option<BufWriter<ChildStdin>>,
    /// Program stdout
    stdout: ChildStdout,
    /// Bytes read past the last chunk
    pending: Vec<u8>,
    /// Prompt token as bytes
    prompt: Vec<u8>,
    response_timeout: Duration,
    exit_timeout: Duration,
    /// The program closed its output
    ended: bool,
    /// `close()` completed
    closed: bool,
    /// Output of a command that ended the program unexpectedly
    partial: Option<String>,
}

impl Session {
    /// Launch the program under test
    pub async fn start(options: &SessionOptions) -> Result<Self> {
        let mut cmd = Command::new(&options.program);
        cmd.args(&options.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()); // Let program errors go to stderr

        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::launch(&options.program, e))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            Error::launch(&options.program, io::Error::other("Failed to get program stdin"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            Error::launch(&options.program, io::Error::other("Failed to get program stdout"))
        })?;

        tracing::debug!(
            program = %options.program.display(),
            pid = ?child.id(),
            "Program started"
        );

        Ok(Self {
            program: options.program.clone(),
            child,
            stdin: Some(BufWriter::new(stdin)),
            stdout,
            pending: Vec::new(),
            prompt: options.prompt.as_bytes().to_vec(),
            response_timeout: options.response_timeout,
            exit_timeout: options.exit_timeout,
            ended: false,
            closed: false,
            partial: None,
        })
    }

    /// Send one command and capture the program's response to it
    ///
    /// End of stream is only a valid response to `.exit`. After any other
    /// command it is a communication error, and whatever the program printed
    /// before exiting is kept for [`Session::take_partial`].
    pub async fn send(&mut self, command: &str) -> Result<String> {
        if command.contains(['\n', '\r']) {
            return Err(Error::InvalidCommand(command.to_string()));
        }

        if self.ended {
            return Err(Error::Communication(format!(
                "'{}' has already exited",
                self.program.display()
            )));
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| {
            Error::Communication("Program input stream is closed".to_string())
        })?;

        tracing::debug!(command, "Sending command");
        write_line(stdin, command).await?;

        let read = framing::read_chunk(&mut self.stdout, &mut self.pending, &self.prompt);
        let chunk = match timeout(self.response_timeout, read).await {
            Ok(chunk) => chunk?,
            Err(_) => {
                tracing::warn!(command, "No response within {:?}", self.response_timeout);
                return Err(Error::Timeout(self.response_timeout.as_millis() as u64));
            }
        };

        let eof = chunk.eof;
        let captured = chunk.into_captured();
        tracing::trace!(captured = %captured, "Captured output");

        if eof {
            tracing::debug!("Program closed its output");
            self.ended = true;
            self.stdin = None;

            if command != EXIT {
                tracing::warn!(command, "Program exited before showing its prompt");
                self.partial = Some(captured);
                return Err(Error::Communication(format!(
                    "'{}' exited unexpectedly after '{}'",
                    self.program.display(),
                    command
                )));
            }
        }

        Ok(captured)
    }

    /// Close the program's input and wait for it to exit
    ///
    /// Kills the program if it doesn't exit within the exit timeout.
    /// Returns the exit code (None when terminated by a signal).
    pub async fn close(mut self) -> Result<Option<i32>> {
        self.stdin = None;

        let status = match timeout(self.exit_timeout, self.child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!(
                    program = %self.program.display(),
                    "Program did not exit within {:?}, killing it",
                    self.exit_timeout
                );
                self.child.kill().await?;
                self.child.wait().await?
            }
        };

        self.closed = true;
        tracing::debug!(code = ?status.code(), "Session closed");
        Ok(status.code())
    }

    /// Program path this session was started with
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process id, while the program is running
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the output printed before an unexpected exit
    pub fn take_partial(&mut self) -> Option<String> {
        self.partial.take()
    }

    /// Whether the program has closed its output
    pub fn has_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best-effort since we can't await in drop
        if !self.closed {
            let _ = self.child.start_kill();
        }
    }
}

/// Write one command line and flush it
async fn write_line(writer: &mut BufWriter<ChildStdin>, line: &str) -> Result<()> {
    let to_error = |e: io::Error| {
        if e.kind() == io::ErrorKind::BrokenPipe {
            Error::Communication("Program input stream closed".to_string())
        } else {
            Error::Communication(format!("Failed to write command: {}", e))
        }
    };

    writer.write_all(line.as_bytes()).await.map_err(to_error)?;
    writer.write_all(b"\n").await.map_err(to_error)?;
    writer.flush().await.map_err(to_error)?;
    Ok(())
}
