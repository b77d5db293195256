use super::ControlPlane;
use crate::config::ControlPlaneConfig;
use crate::runtime::RuntimeError;
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    context: Option<String>,
    namespace: Option<String>,
    timeout: Duration,
}

impl KubectlClient {
    pub fn from_config(config: &ControlPlaneConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            context: config.context.clone(),
            namespace: config.namespace.clone(),
            timeout: config.timeout.get(),
        }
    }

    /// Global flags followed by `args`.
    fn full_args(&self, args: &[&str]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 5);
        if let Some(context) = &self.context {
            full.push(format!("--context={}", context));
        }
        if let Some(namespace) = &self.namespace {
            full.push(format!("--namespace={}", namespace));
        }
        full.push(format!("--request-timeout={}s", self.timeout.as_secs().max(1)));
        full.extend(args.iter().map(|a| a.to_string()));
        full
    }

    async fn run(&self, args: &[&str]) -> Result<Output, RuntimeError> {
        let full = self.full_args(args);
        let command = format!("{} {}", self.binary, full.join(" "));

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(&full).stdin(Stdio::null()).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => Ok(output),
            Ok(Ok(output)) => Err(RuntimeError::failed(command, &output)),
            Ok(Err(e)) => Err(RuntimeError::exec_failed(command, e)),
            Err(_) => Err(RuntimeError::timeout(command, self.timeout)),
        }
    }
}

#[async_trait]
impl ControlPlane for KubectlClient {
    async fn scale(&self, workload: &str, replicas: u32) -> Result<(), RuntimeError> {
        let target = qualify_workload(workload);
        let replicas = format!("--replicas={}", replicas);
        self.run(&["scale", &target, &replicas]).await?;
        Ok(())
    }

    async fn delete_pods(&self, selector: &str) -> Result<(), RuntimeError> {
        self.run(&[
            "delete",
            "pods",
            "-l",
            selector,
            "--wait=false",
            "--ignore-not-found",
        ])
        .await?;
        Ok(())
    }
}

/// `api` -> `deployment/api`; `statefulset/db` is kept as is.
pub fn qualify_workload(workload: &str) -> String {
    if workload.contains('/') {
        workload.to_string()
    } else {
        format!("deployment/{}", workload)
    }
}
