use super::{HealthProbe, ProbeFailure, ProbeResult};
use async_trait::async_trait;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Kills the command's process group on drop unless disarmed, so a pipeline
/// abandoned by a timeout takes its grandchildren with it.
struct GroupGuard(Option<Pid>);

impl GroupGuard {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.0 {
            // ESRCH: the group already exited
            let _ = killpg(pgid, Signal::SIGKILL);
        }
    }
}

/// Passes when `sh -c <command>` exits 0.
pub struct CommandProbe {
    command: String,
}

impl CommandProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for CommandProbe {
    async fn check(&self, timeout: Duration) -> ProbeResult {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeFailure::Other(format!("failed to spawn: {}", e)))?;

        // The shell leads its own group, so its pid is the group id
        let mut guard = GroupGuard(
            child
                .id()
                .and_then(|pid| i32::try_from(pid).ok())
                .map(Pid::from_raw),
        );

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                guard.disarm();
                if status.success() {
                    Ok("exit 0".to_string())
                } else {
                    Err(ProbeFailure::ExitCode(status.code()))
                }
            }
            Ok(Err(e)) => Err(ProbeFailure::Other(format!("failed to wait: {}", e))),
            Err(_) => Err(ProbeFailure::Timeout(timeout)),
        }
    }

    fn target(&self) -> &str {
        &self.command
    }
}
