//! External container runtime the orchestrator stops and starts containers
//! through. Only its CLI is used; no daemon API client.

pub mod docker;
pub mod error;

pub use docker::DockerClient;
pub use error::RuntimeError;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerState {
    pub name: String,
    pub status: ContainerStatus,
}

/// Container lifecycle operations by name.
///
/// `stop` and `remove` succeed for containers that do not exist.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list(&self, names: &[String]) -> Result<Vec<ContainerState>, RuntimeError>;
    async fn start(&self, name: &str) -> Result<(), RuntimeError>;
    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;
    async fn remove(&self, name: &str) -> Result<(), RuntimeError>;
}
