//! Timed external command execution
//!
//! Long-running update commands must never hang the run. Each invocation
//! races the child against a deadline; on expiry the child is killed and
//! the caller gets a `Timeout`, which unwinds to the top level.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Errors from external command execution
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("'{program}' exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("failed to run '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type CommandResult<T> = Result<T, CommandError>;

fn base_command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // A dropped future must not leave the child running.
        .kill_on_drop(true);
    cmd
}

fn io_err(program: &str, source: std::io::Error) -> CommandError {
    CommandError::Io {
        program: program.to_string(),
        source,
    }
}

/// Run a command to completion, enforcing the given deadline. Returns
/// stdout on success; a non-zero exit is an error carrying stderr.
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> CommandResult<String> {
    debug!(program, ?args, ?timeout, "Running command");

    let output = match tokio::time::timeout(timeout, base_command(program, args).output()).await {
        Ok(result) => result.map_err(|e| io_err(program, e))?,
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a short command with no explicit deadline (probes, signals).
pub async fn run(program: &str, args: &[&str]) -> CommandResult<String> {
    debug!(program, ?args, "Running command");

    let output = base_command(program, args)
        .output()
        .await
        .map_err(|e| io_err(program, e))?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command and report its exit status without treating non-zero as
/// failure. Dialog helpers encode the pressed button in the status.
pub async fn run_exit_code(program: &str, args: &[&str]) -> CommandResult<i32> {
    debug!(program, ?args, "Running command for exit code");

    let output = base_command(program, args)
        .output()
        .await
        .map_err(|e| io_err(program, e))?;

    Ok(output.status.code().unwrap_or(-1))
}

/// Run a command feeding `input` to its stdin.
pub async fn run_with_stdin(program: &str, args: &[&str], input: &str) -> CommandResult<String> {
    debug!(program, ?args, "Running command with stdin");

    let mut cmd = base_command(program, args);
    cmd.stdin(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| io_err(program, e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| io_err(program, e))?;
        drop(stdin);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| io_err(program, e))?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
