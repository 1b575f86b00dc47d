// src/recipe/kitchen/runner.rs

//! Sub-process execution
//!
//! Every external command the kitchen runs (the four CMake stages, the
//! smoke-test compile and run, pkg-config probes) goes through the
//! [`CommandRunner`] trait. The exit status is the only success signal;
//! stdout and stderr are captured for the build log and error reports.

use crate::error::{Error, ExitCode, Result};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Number of output lines kept when a command fails
pub const FAILURE_CONTEXT_LINES: usize = 50;

/// How long to wait for pipe readers after killing a timed-out command
const KILL_GRACE: Duration = Duration::from_millis(200);

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument, optionally glued to a flag (`-I/path`)
    pub fn path_arg(self, flag: &str, path: &Path) -> Self {
        self.arg(format!("{}{}", flag, path.display()))
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The command line as a single shell-like string (for logs)
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push_str(&format!("'{}'", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: ExitCode,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn with_code(code: i32) -> Self {
        Self {
            status: ExitCode::Code(code),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.status == ExitCode::Code(0)
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        out.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') && !self.stderr.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }

    /// The last `lines` lines of combined output
    pub fn tail(&self, lines: usize) -> String {
        let combined = self.combined();
        let all: Vec<&str> = combined.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

/// Runs external commands
pub trait CommandRunner {
    /// Run a command to completion and capture its output
    ///
    /// A non-zero exit is *not* an error at this level; it comes back in
    /// [`CommandOutput::status`]. Errors are reserved for commands that
    /// could not be started or were killed.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs commands on the host with an optional timeout
pub struct SystemRunner {
    timeout: Option<Duration>,
    /// Log sub-process output lines at info level instead of debug
    echo: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            timeout: None,
            echo: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    fn log_lines(&self, program: &str, text: &str, is_stderr: bool) {
        for line in text.lines() {
            if self.echo {
                info!("[{}] {}", program, line);
            } else if is_stderr {
                debug!("[{}] stderr: {}", program, line);
            } else {
                debug!("[{}] {}", program, line);
            }
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects one child pipe on a background thread
///
/// Bytes are appended as they arrive, so whatever was read so far is still
/// available when the child has to be killed.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: thread::JoinHandle<()>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(reader: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let Some(mut reader) = reader else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
        });

        Self { buf, handle }
    }

    fn contents(buf: &Mutex<Vec<u8>>) -> String {
        buf.lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }

    /// Wait for end of stream
    fn finish(self) -> String {
        let Self { buf, handle } = self;
        let _ = handle.join();
        Self::contents(&buf)
    }

    /// Wait at most `grace` for end of stream, then take what was read
    ///
    /// Grandchildren of a killed process can hold the pipe open indefinitely.
    fn settle(self, grace: Duration) -> String {
        let Self { buf, handle } = self;
        let deadline = Instant::now() + grace;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if handle.is_finished() {
            let _ = handle.join();
        }
        Self::contents(&buf)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!("Executing: {}", invocation);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| Error::SpawnFailed {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

        // Drain pipes concurrently so a chatty build tool can't fill them and stall
        let stdout = Drain::spawn(child.stdout.take());
        let stderr = Drain::spawn(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => status,
                None => {
                    warn!(
                        "'{}' exceeded {} seconds, killing it",
                        invocation.program,
                        timeout.as_secs()
                    );
                    let _ = child.kill();
                    let _ = child.wait();

                    let partial = CommandOutput {
                        status: ExitCode::Unknown,
                        stdout: stdout.settle(KILL_GRACE),
                        stderr: stderr.settle(KILL_GRACE),
                    };
                    self.log_lines(&invocation.program, &partial.stdout, false);
                    self.log_lines(&invocation.program, &partial.stderr, true);

                    return Err(Error::Timeout {
                        program: invocation.program.clone(),
                        seconds: timeout.as_secs(),
                        output: partial.tail(FAILURE_CONTEXT_LINES),
                    });
                }
            },
            None => child.wait()?,
        };

        let stdout = stdout.finish();
        let stderr = stderr.finish();

        self.log_lines(&invocation.program, &stdout, false);
        self.log_lines(&invocation.program, &stderr, true);

        Ok(CommandOutput {
            status: ExitCode::from_code(status.code()),
            stdout,
            stderr,
        })
    }
}

/// Records invocations without running anything
///
/// Every command succeeds unless a failure rule matches it. Used for
/// `--dry-run` planning and as a test double.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    failures: Vec<(String, i32)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any invocation whose command line contains `pattern` exit with `code`
    pub fn fail_when(mut self, pattern: impl Into<String>, code: i32) -> Self {
        self.failures.push((pattern.into(), code));
        self
    }

    /// Everything run so far, in order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        let line = invocation.command_line();
        let code = self
            .failures
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);

        let mut output = CommandOutput::with_code(code);
        if code != 0 {
            output.stderr = format!("{}: simulated failure", invocation.program);
        }
        Ok(output)
    }
}
