// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(stack::config::error))]
    Config(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(stack::config::validation),
        help("Check the services, ports and probes declared in stack.yaml")
    )]
    Validation(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown service: {0}")]
    #[diagnostic(
        code(stack::registry::unknown_service),
        help("List registered services with `stackctl ports`")
    )]
    UnknownService(String),

    #[error("Invalid PID {pid}: {reason}")]
    #[diagnostic(code(stack::process::invalid_pid))]
    InvalidPid { pid: u32, reason: String },

    #[error("Invalid probe for '{label}': {reason}")]
    #[diagnostic(
        code(stack::health::invalid_probe),
        help("Probes take the form `tcp: host:port`, `http: http://host:port/path` or `command: ...`")
    )]
    InvalidProbe { label: String, reason: String },

    #[error("Operation cancelled during {0}")]
    Cancelled(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::UnknownService(name) => Some(format!(
                "'{}' is not declared under `services:` for the active profile. Run `stackctl ports` to list registered services.",
                name
            )),
            Error::Config(msg) if msg.contains("Could not find") => Some(
                "Create a stack.yaml in the project root or pass one with --config".to_string(),
            ),
            Error::Config(_) | Error::Validation(_) | Error::Yaml(_) => {
                Some("Fix stack.yaml and re-run; no processes were touched.".to_string())
            }
            Error::InvalidProbe { label, .. } => Some(format!(
                "Fix the `probe:` entry of service '{}' in stack.yaml",
                label
            )),
            Error::Cancelled(_) => Some(
                "Signals already sent are not undone. Re-run the same command to finish the job."
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}

/// Validates a PID before any signal is sent to it.
///
/// Rejects PID 0 (process group), PID 1 (init), values above `i32::MAX` and
/// the PID of the running tool itself.
pub fn validate_pid(pid: u32) -> Result<nix::unistd::Pid> {
    if pid == 0 {
        return Err(Error::InvalidPid {
            pid,
            reason: "PID 0 refers to the process group, not a process".to_string(),
        });
    }
    if pid == 1 {
        return Err(Error::InvalidPid {
            pid,
            reason: "refusing to signal PID 1 (init)".to_string(),
        });
    }
    if pid > i32::MAX as u32 {
        return Err(Error::InvalidPid {
            pid,
            reason: "exceeds i32::MAX, cannot convert safely".to_string(),
        });
    }
    if pid == std::process::id() {
        return Err(Error::InvalidPid {
            pid,
            reason: "refusing to signal our own process".to_string(),
        });
    }
    Ok(nix::unistd::Pid::from_raw(pid as i32))
}
