//! Bounded external command execution.
//!
//! Every adapter funnels its tool invocation through [`run_command`] so
//! that timeout and kill semantics are implemented once. The child is
//! polled against a deadline; on expiry it is killed and the partial
//! output is returned with `timed_out` set.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Exit code reported when the child was killed by a signal.
const EXIT_SIGNALED: i32 = -1;

/// Poll interval while waiting for the child.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of a bounded external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// Wall-clock time the command ran for.
    pub elapsed: Duration,
}

/// Resolved location of a required external executable.
#[derive(Debug, Clone)]
pub struct ToolCheck {
    pub name: String,
    pub available: bool,
    pub path: Option<PathBuf>,
}

/// Look up an executable on PATH.
pub fn find_tool(name: &str) -> ToolCheck {
    let path = which(name);
    ToolCheck {
        name: name.to_string(),
        available: path.is_some(),
        path,
    }
}

/// Minimal PATH lookup. Returns the first matching executable.
fn which(name: &str) -> Option<PathBuf> {
    // Absolute or relative paths are checked directly
    if name.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(name);
        return if is_executable(&p) { Some(p) } else { None };
    }

    let paths = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&paths) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{}.exe", name));
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run `program` with `args`, killing it after `timeout`.
///
/// `cwd` overrides the working directory when set. An `Err` here means
/// the process could not be spawned at all; a non-zero exit or timeout
/// is reported in the returned [`CommandOutput`], not as an error.
pub fn run_command(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> std::io::Result<CommandOutput> {
    let start = Instant::now();

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn()?;

    // Drain both pipes on background threads so a chatty child cannot
    // deadlock against a full pipe buffer.
    let stdout_handle = spawn_reader(child.stdout.take());
    let stderr_handle = spawn_reader(child.stderr.take());

    let deadline = start + timeout;
    let mut timed_out = false;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            timed_out = true;
            let _ = child.kill();
            break child.wait().ok();
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    let exit_code = status.and_then(|s| s.code()).unwrap_or(EXIT_SIGNALED);

    Ok(CommandOutput {
        exit_code,
        stdout,
        stderr,
        timed_out,
        elapsed: start.elapsed(),
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    source: Option<R>,
) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut r) = source {
            let _ = r.read_to_string(&mut buf);
        }
        buf
    })
}
