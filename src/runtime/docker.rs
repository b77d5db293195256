//! `docker`/`podman` CLI client.
//!
//! Every invocation goes through [`DockerClient::run`], which applies the
//! configured timeout and kills the child if it is exceeded.

use super::{ContainerRuntime, ContainerState, ContainerStatus, RuntimeError};
use crate::config::RuntimeConfig;
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DockerClient {
    binary: String,
    timeout: Duration,
}

impl DockerClient {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.binary.clone(), config.timeout.get())
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command_string(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run with the client timeout, returning raw Output.
    async fn run(&self, args: &[&str]) -> Result<Output, RuntimeError> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RuntimeError::exec_failed(self.command_string(args), e)),
            Err(_) => Err(RuntimeError::timeout(
                self.command_string(args),
                self.timeout,
            )),
        }
    }

    /// Run, treating "No such container" as success.
    async fn run_tolerating_missing(&self, args: &[&str]) -> Result<(), RuntimeError> {
        let output = self.run(args).await?;
        if output.status.success() || is_missing_container(&output) {
            return Ok(());
        }
        Err(RuntimeError::failed(self.command_string(args), &output))
    }

    /// Whether the daemon answers `info`.
    pub async fn daemon_healthy(&self) -> bool {
        matches!(
            self.run(&["info", "--format", "{{.ServerVersion}}"]).await,
            Ok(o) if o.status.success()
        )
    }

    /// `<binary> --version`, trimmed.
    pub async fn version(&self) -> Result<String, RuntimeError> {
        let output = self.run(&["--version"]).await?;
        if !output.status.success() {
            return Err(RuntimeError::failed(self.command_string(&["--version"]), &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list(&self, names: &[String]) -> Result<Vec<ContainerState>, RuntimeError> {
        let args = ["ps", "-a", "--format", "{{.Names}}\t{{.State}}"];
        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(RuntimeError::failed(self.command_string(&args), &output));
        }
        Ok(parse_ps_states(
            &String::from_utf8_lossy(&output.stdout),
            names,
        ))
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        let args = ["start", name];
        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(RuntimeError::failed(self.command_string(&args), &output))
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.run_tolerating_missing(&["stop", name]).await
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.run_tolerating_missing(&["rm", "-f", name]).await
    }
}

fn is_missing_container(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr.contains("No such container") || stderr.contains("no such container")
}

/// States for `names` from `ps --format '{{.Names}}\t{{.State}}'` output.
///
/// Names absent from the listing are reported as missing, in the order given.
pub fn parse_ps_states(stdout: &str, names: &[String]) -> Vec<ContainerState> {
    let listed: Vec<(&str, &str)> = stdout
        .lines()
        .filter_map(|line| line.trim().split_once('\t'))
        .collect();

    names
        .iter()
        .map(|name| {
            let status = listed
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .map(|(_, state)| {
                    if state.eq_ignore_ascii_case("running") {
                        ContainerStatus::Running
                    } else {
                        ContainerStatus::Stopped
                    }
                })
                .unwrap_or(ContainerStatus::Missing);
            ContainerState {
                name: name.clone(),
                status,
            }
        })
        .collect()
}
