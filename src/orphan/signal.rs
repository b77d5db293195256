//! Signal delivery and liveness checks.
//!
//! The [`Signaller`] trait is the seam tests use to stand in for the kernel.

use crate::error::{validate_pid, Error, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Graceful shutdown request (SIGTERM).
    Terminate,
    /// Forced kill (SIGKILL).
    Kill,
}

impl SignalKind {
    fn as_nix(self) -> Signal {
        match self {
            SignalKind::Terminate => Signal::SIGTERM,
            SignalKind::Kill => Signal::SIGKILL,
        }
    }
}

/// Result of a delivered signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The process no longer exists.
    NoSuchProcess,
}

pub trait Signaller: Send + Sync {
    /// Send `signal` to `pid`. A process that is already gone is not an
    /// error.
    fn send(&self, pid: u32, signal: SignalKind) -> Result<Delivery>;

    /// Whether `pid` still exists. Zombies count as dead.
    fn is_alive(&self, pid: u32) -> bool;
}

/// Kernel-backed signaller using `kill(2)`.
#[derive(Debug, Clone)]
pub struct UnixSignaller {
    proc_root: PathBuf,
}

impl UnixSignaller {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    fn is_zombie(&self, pid: u32) -> bool {
        std::fs::read_to_string(self.proc_root.join(pid.to_string()).join("stat"))
            .ok()
            .and_then(|stat| process_state(&stat))
            .is_some_and(|state| state == 'Z' || state == 'X')
    }
}

impl Default for UnixSignaller {
    fn default() -> Self {
        Self::new()
    }
}

impl Signaller for UnixSignaller {
    fn send(&self, pid: u32, kind: SignalKind) -> Result<Delivery> {
        let nix_pid = validate_pid(pid)?;
        match signal::kill(nix_pid, kind.as_nix()) {
            Ok(()) => Ok(Delivery::Sent),
            Err(Errno::ESRCH) => Ok(Delivery::NoSuchProcess),
            Err(errno) => Err(Error::InvalidPid {
                pid,
                reason: format!("kill failed: {}", errno.desc()),
            }),
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Ok(nix_pid) = validate_pid(pid) else {
            // init and ourselves are always alive from our point of view
            return pid != 0;
        };
        match signal::kill(nix_pid, None) {
            // EPERM: exists but belongs to someone else
            Ok(()) | Err(Errno::EPERM) => !self.is_zombie(pid),
            Err(_) => false,
        }
    }
}

/// State letter from a `/proc/<pid>/stat` line.
///
/// The command name is parenthesised and may itself contain spaces or
/// parentheses, so the state is read after the last `)`.
pub fn process_state(stat: &str) -> Option<char> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}
