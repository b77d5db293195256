//! Optional orchestrator control plane (Kubernetes via `kubectl`).
//!
//! Used to scale workloads down before host-level reclamation on `stop` and
//! back up on `start`. Calls are best effort: failures are reported, not
//! fatal.

pub mod kubectl;

pub use kubectl::KubectlClient;

use crate::runtime::RuntimeError;
use async_trait::async_trait;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Set `workload` to `replicas`. A bare name means `deployment/<name>`.
    async fn scale(&self, workload: &str, replicas: u32) -> Result<(), RuntimeError>;

    /// Delete pods matching a label selector without waiting.
    async fn delete_pods(&self, selector: &str) -> Result<(), RuntimeError>;
}
