use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wait_timeout::ChildExt;

/// Exit code reported when a command exceeds its timeout.
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code reported when a command could not be started at all.
pub const EXIT_NOT_FOUND: i32 = 127;

/// How to invoke an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// Program plus discrete arguments. No shell is involved, so arguments
    /// are never re-split or expanded.
    Argv { program: String, args: Vec<String> },
    /// A command line run through `sh -c`, for pipes and redirects.
    Shell(String),
}

impl CommandSpec {
    pub fn argv<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Argv {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn shell(line: impl Into<String>) -> Self {
        Self::Shell(line.into())
    }

    /// The executable that will be looked up on `PATH`.
    pub fn program(&self) -> &str {
        match self {
            Self::Argv { program, .. } => program,
            Self::Shell(_) => "sh",
        }
    }

    fn to_command(&self) -> Command {
        match self {
            Self::Argv { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            Self::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Argv { program, args } if args.is_empty() => write!(f, "{program}"),
            Self::Argv { program, args } => write!(f, "{} {}", program, args.join(" ")),
            Self::Shell(line) => write!(f, "{line}"),
        }
    }
}

/// Result of one command invocation. Output streams are trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == EXIT_TIMEOUT
    }

    fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Executes external commands on behalf of collectors.
///
/// Implementations never fail: timeouts and spawn errors are folded into
/// the returned [`CommandOutput`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> CommandOutput;

    /// Resolve an executable on the search path.
    fn which(&self, program: &str) -> Option<PathBuf>;
}

/// Runs real processes on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> CommandOutput {
        run(spec, timeout)
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        find_executable(program)
    }
}

/// Run a command, waiting at most `timeout` for it to exit.
pub fn run(spec: &CommandSpec, timeout: Duration) -> CommandOutput {
    let mut command = spec.to_command();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(command = %spec, "executable not found");
            return CommandOutput::failed(EXIT_NOT_FOUND, e.to_string());
        }
        Err(e) => {
            tracing::error!(command = %spec, error = %e, "failed to start command");
            return CommandOutput::failed(EXIT_NOT_FOUND, e.to_string());
        }
    };

    // Drain both pipes on their own threads so a chatty child can't block
    // on a full pipe while we wait on it.
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::error!(command = %spec, ?timeout, "command timed out");
            return CommandOutput::failed(EXIT_TIMEOUT, "Timeout");
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::error!(command = %spec, error = %e, "failed waiting for command");
            return CommandOutput::failed(1, e.to_string());
        }
    };

    let output = CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    };
    tracing::debug!(command = %spec, exit_code = output.exit_code, "command finished");
    output
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).trim().to_string()
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Look up `program` on `PATH`. Names containing a path separator are
/// checked directly.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(program);
        return is_executable(&path).then_some(path);
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
