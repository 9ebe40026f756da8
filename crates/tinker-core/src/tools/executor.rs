//! Tool execution against a contained root directory.
//!
//! # Containment
//!
//! Every path-bearing argument is joined against the root and lexically
//! normalized; the result must be the root or a descendant of it. This is a
//! lexical guarantee only: a symlink already present inside the root and
//! pointing outside it is not detected. That is a documented limitation.
//!
//! # Subprocesses
//!
//! Only `shell` and `apply_patch` spawn a subprocess. Both run in the root
//! and are bounded by a wall-clock timeout that kills the child on expiry.
//! Stdout and stderr are drained on reader threads so a chatty child cannot
//! deadlock on a full pipe.

use std::fs;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::{ToolAction, ToolError, ToolResult};

/// Default wall-clock limit for subprocesses, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Executes tools inside a fixed root directory.
///
/// The root is set once at construction and never changes for the
/// executor's lifetime. `execute` is a total function: every input yields a
/// [`ToolResult`].
pub struct ToolExecutor {
    root: PathBuf,
    timeout_secs: u64,
}

impl ToolExecutor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_timeout(root, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(root: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root, timeout_secs }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Execute a named tool with parsed JSON arguments.
    pub fn execute(&self, name: &str, args: &Value) -> ToolResult {
        let action = match ToolAction::parse(name, args) {
            Ok(action) => action,
            Err(err) => return ToolResult::failure(err),
        };
        log::debug!("executing {} in {}", action.name(), self.root.display());
        match self.dispatch(&action) {
            Ok(result) => result,
            Err(err) => {
                log::debug!("{} failed: {}", action.name(), err);
                ToolResult::failure(err)
            }
        }
    }

    fn dispatch(&self, action: &ToolAction) -> Result<ToolResult, ToolError> {
        match action {
            ToolAction::Shell { command } => self.shell(command),
            ToolAction::ReadFile { path } => self.read_file(path),
            ToolAction::WriteFile { path, content } => self.write_file(path, content),
            ToolAction::ListFiles { path } => self.list_files(path),
            ToolAction::ApplyPatch { path, patch } => self.apply_patch(path, patch),
        }
    }

    /// Resolve a tool-supplied path against the root, rejecting escapes
    /// before any filesystem access happens.
    fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let normalized = normalize(&self.root.join(path));
        if !normalized.starts_with(&self.root) {
            return Err(ToolError::OutsideRoot(path.to_string()));
        }
        Ok(normalized)
    }

    fn shell(&self, command: &str) -> Result<ToolResult, ToolError> {
        let mut cmd = shell_command(command);
        cmd.current_dir(&self.root);

        let outcome = self.run_bounded(cmd)?;

        let mut output = outcome.stdout;
        if !outcome.stderr.is_empty() {
            output.push_str("\n[stderr]\n");
            output.push_str(&outcome.stderr);
        }
        let output = output.trim().to_string();

        if outcome.status.success() {
            Ok(ToolResult::ok(output))
        } else {
            Ok(ToolResult {
                success: false,
                output,
                error: Some(format!("Exit code: {}", exit_code(&outcome.status))),
            })
        }
    }

    fn read_file(&self, path: &str) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(ToolError::FileNotFound(path.to_string()));
        }
        let content = fs::read_to_string(&resolved)?;
        Ok(ToolResult::ok(content))
    }

    fn write_file(&self, path: &str, content: &str) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&resolved, content)?;
        Ok(ToolResult::ok(format!(
            "Wrote {} bytes to {}",
            content.len(),
            path
        )))
    }

    fn list_files(&self, path: &str) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Err(ToolError::PathNotFound(path.to_string()));
        }
        if resolved.is_file() {
            return Ok(ToolResult::ok(path));
        }

        let mut entries: Vec<(String, bool)> = Vec::new();
        for entry in fs::read_dir(&resolved)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.path().is_dir();
            entries.push((name, is_dir));
        }
        entries.sort();

        let listing: Vec<String> = entries
            .into_iter()
            .map(|(name, is_dir)| {
                if is_dir {
                    format!("{name}{MAIN_SEPARATOR}")
                } else {
                    name
                }
            })
            .collect();

        Ok(ToolResult::ok(listing.join("\n")))
    }

    fn apply_patch(&self, path: &str, patch: &str) -> Result<ToolResult, ToolError> {
        let resolved = self.resolve(path)?;

        // The diff goes through a transient on-disk file; NamedTempFile
        // removes it on drop regardless of outcome.
        let mut patch_file = tempfile::NamedTempFile::new()?;
        patch_file.write_all(patch.as_bytes())?;

        let mut cmd = Command::new("patch");
        cmd.arg(&resolved)
            .arg(patch_file.path())
            .current_dir(&self.root);

        let outcome = match self.run_bounded(cmd) {
            Ok(outcome) => outcome,
            Err(ToolError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::PatchUnavailable);
            }
            Err(err) => return Err(err),
        };

        if outcome.status.success() {
            Ok(ToolResult::ok(format!("Patch applied to {path}")))
        } else {
            let stderr = outcome.stderr.trim();
            let error = if stderr.is_empty() {
                format!("Patch failed with exit code {}", exit_code(&outcome.status))
            } else {
                stderr.to_string()
            };
            Ok(ToolResult {
                success: false,
                output: outcome.stdout,
                error: Some(error),
            })
        }
    }

    /// Run a command to completion, killing it when the wall-clock limit
    /// expires.
    fn run_bounded(&self, mut cmd: Command) -> Result<CommandOutcome, ToolError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + Duration::from_secs(self.timeout_secs);
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                log::warn!("killing subprocess after {}s timeout", self.timeout_secs);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::Timeout(self.timeout_secs));
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(CommandOutcome {
            status,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }
}

struct CommandOutcome {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Read a child pipe to the end on a background thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

/// Lexically resolve `.` and `..` components without touching the
/// filesystem. A `..` that would climb past the start of the path is kept,
/// so escape attempts fail the containment check instead of vanishing.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
