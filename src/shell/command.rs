//! External command execution.

use crate::error::{PackagerError, Result};
use anyhow::{anyhow, Context};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use super::path::{parse_system_path, resolve_tool_path};

/// How often a deadline-bound child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Combined stdout and stderr, empty unless captured.
    pub output: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,

    /// Whether the command was still running at its deadline and was killed.
    pub timed_out: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(output: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            output: output.into(),
            duration,
            success: true,
            timed_out: false,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: Option<i32>, output: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code,
            output: output.into(),
            duration,
            success: false,
            timed_out: false,
        }
    }

    /// Create a result for a command killed at its deadline.
    pub fn timed_out(output: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code: None,
            output: output.into(),
            duration,
            success: false,
            timed_out: true,
        }
    }
}

/// A command to run: program, arguments and execution options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSpec {
    /// Program name, looked up on PATH.
    pub program: String,

    /// Arguments passed verbatim, no shell involved.
    pub args: Vec<String>,

    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment overrides (merged with the inherited environment).
    pub env: BTreeMap<String, String>,

    /// Capture combined output (if false, inherits stdout/stderr).
    pub capture: bool,

    /// Kill the command if it is still running after this long.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
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

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Renders as a shell-like line, environment overrides first.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs external processes.
///
/// This trait allows scripting process outcomes in tests.
pub trait ProcessRunner {
    /// Locate an executable on the search path.
    fn which(&self, program: &str) -> Option<PathBuf>;

    /// Run a command to completion or until its deadline.
    ///
    /// A non-zero exit is a normal result; only a failure to start the
    /// process is an error.
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult>;
}

/// Runner backed by real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn which(&self, program: &str) -> Option<PathBuf> {
        resolve_tool_path(program, &parse_system_path())
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        execute(spec)
    }
}

/// Execute a command.
pub fn execute(spec: &CommandSpec) -> Result<CommandResult> {
    let start = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    if spec.capture {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    }

    if spec.timeout.is_some() {
        isolate_process_group(&mut cmd);
    }

    tracing::debug!("Running: {}", spec);

    let mut child = cmd.spawn().map_err(|e| PackagerError::CommandFailed {
        command: spec.to_string(),
        message: e.to_string(),
    })?;

    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, tx.clone()));
    }
    drop(tx);

    let status = match spec.timeout {
        Some(limit) => wait_with_deadline(&mut child, limit),
        None => child.wait().map(Some),
    }
    .with_context(|| format!("waiting for '{}'", spec))?;

    for reader in readers {
        reader
            .join()
            .map_err(|_| anyhow!("output reader for '{}' panicked", spec))?;
    }

    let mut output = String::new();
    for line in rx {
        output.push_str(&line);
        output.push('\n');
    }

    let duration = start.elapsed();

    match status {
        None => {
            tracing::debug!("Killed after {:?}: {}", duration, spec);
            Ok(CommandResult::timed_out(output, duration))
        }
        Some(status) if status.success() => Ok(CommandResult::success(output, duration)),
        Some(status) => Ok(CommandResult::failure(status.code(), output, duration)),
    }
}

/// Forward each line of a stream into the shared output channel.
fn spawn_reader<R>(stream: R, tx: mpsc::Sender<String>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(std::result::Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}

/// Wait for the child, killing it once `limit` has elapsed.
///
/// Returns `None` when the child was killed.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_process_group(child);
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn isolate_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_cmd: &mut Command) {}

/// Kill the child and everything it spawned.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    // The child leads its own group, so the negated pid addresses all of it.
    let pgid = child.id() as libc::pid_t;
    // SAFETY: kill(2) has no memory-safety preconditions.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_display_renders_env_program_and_args() {
        let spec = CommandSpec::new("rvm")
            .args(["3.2.2@veracode", "do", "rails", "server"])
            .env("RAILS_ENV", "test");
        assert_eq!(
            spec.to_string(),
            "RAILS_ENV=test rvm 3.2.2@veracode do rails server"
        );
    }

    #[test]
    fn spec_builder_sets_options() {
        let spec = CommandSpec::new("git")
            .arg("clone")
            .cwd("/tmp")
            .capture()
            .timeout(Duration::from_secs(3));
        assert_eq!(spec.args, vec!["clone".to_string()]);
        assert_eq!(spec.cwd, Some(PathBuf::from("/tmp")));
        assert!(spec.capture);
        assert_eq!(spec.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn missing_program_is_command_failed() {
        let spec = CommandSpec::new("definitely-not-a-real-program-vcrbpkg").capture();
        let err = execute(&spec).unwrap_err();
        match err {
            PackagerError::CommandFailed { command, message } => {
                assert_eq!(command, "definitely-not-a-real-program-vcrbpkg");
                assert!(!message.is_empty());
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn execute_captures_stdout_and_stderr() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .capture();
        let result = execute(&spec).unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn execute_reports_exit_code() {
        let spec = CommandSpec::new("sh").args(["-c", "exit 3"]).capture();
        let result = execute(&spec).unwrap();

        assert!(!result.success);
        assert!(!result.timed_out);
        assert_eq!(result.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn execute_with_env_and_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo $MY_VAR; pwd"])
            .env("MY_VAR", "my_value")
            .cwd(temp.path())
            .capture();
        let result = execute(&spec).unwrap();

        assert!(result.success);
        assert!(result.output.contains("my_value"));
    }

    #[cfg(unix)]
    #[test]
    fn execute_kills_at_deadline() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "sleep 30"])
            .capture()
            .timeout(Duration::from_millis(300));
        let result = execute(&spec).unwrap();

        assert!(result.timed_out);
        assert!(!result.success);
        assert_eq!(result.exit_code, None);
        assert!(result.duration < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn execute_kills_grandchildren_at_deadline() {
        // The backgrounded sleep holds the pipe open; reaching the end means
        // it was killed with its parent.
        let spec = CommandSpec::new("sh")
            .args(["-c", "sleep 30 & wait"])
            .capture()
            .timeout(Duration::from_millis(300));
        let result = execute(&spec).unwrap();

        assert!(result.timed_out);
        assert!(result.duration < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn execute_before_deadline_is_not_timed_out() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo quick"])
            .capture()
            .timeout(Duration::from_secs(10));
        let result = execute(&spec).unwrap();

        assert!(result.success);
        assert!(!result.timed_out);
        assert!(result.output.contains("quick"));
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_finds_sh() {
        let runner = SystemRunner::new();
        assert!(runner.which("sh").is_some());
        assert!(runner.which("definitely-not-a-real-program-vcrbpkg").is_none());
    }
}
