use std::fmt;
use std::time::Duration;

/// Structured error for container-runtime and control-plane CLI calls.
#[derive(Debug)]
pub enum RuntimeError {
    /// Command did not finish within its timeout and was killed.
    Timeout { command: String, timeout: Duration },

    /// Command ran but returned non-zero exit.
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// Binary couldn't be executed (not in PATH, permission denied).
    ExecFailed {
        command: String,
        source: std::io::Error,
    },

    /// Runtime daemon not responding.
    DaemonUnavailable { command: String },
}

impl RuntimeError {
    pub fn timeout(cmd: impl Into<String>, dur: Duration) -> Self {
        RuntimeError::Timeout {
            command: cmd.into(),
            timeout: dur,
        }
    }

    /// Classify a non-zero exit from its stderr.
    pub fn failed(cmd: impl Into<String>, output: &std::process::Output) -> Self {
        let command = cmd.into();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("Cannot connect to the Docker daemon")
            || stderr.contains("Is the docker daemon running")
        {
            return RuntimeError::DaemonUnavailable { command };
        }
        RuntimeError::CommandFailed {
            command,
            stderr,
            exit_code: output.status.code(),
        }
    }

    pub fn exec_failed(cmd: impl Into<String>, err: std::io::Error) -> Self {
        RuntimeError::ExecFailed {
            command: cmd.into(),
            source: err,
        }
    }

    /// Whether the binary itself is missing.
    pub fn is_not_installed(&self) -> bool {
        matches!(
            self,
            RuntimeError::ExecFailed { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Timeout { command, timeout } => {
                write!(f, "Timed out running '{}' (exceeded {:?})", command, timeout)
            }
            RuntimeError::CommandFailed {
                command,
                stderr,
                exit_code,
            } => {
                if let Some(code) = exit_code {
                    write!(f, "'{}' failed (exit code {}): {}", command, code, stderr)
                } else {
                    write!(f, "'{}' failed: {}", command, stderr)
                }
            }
            RuntimeError::ExecFailed { command, source } => {
                write!(f, "Failed to execute '{}': {}", command, source)
            }
            RuntimeError::DaemonUnavailable { command } => {
                write!(f, "Container daemon is not responding ('{}')", command)
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::ExecFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
