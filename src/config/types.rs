//! Core configuration types.
//!
//! This module contains the root [`Config`] struct loaded from `stack.yaml`
//! and the per-concern sections it is made of.

use super::{HumanDuration, ServiceConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Profile used when neither the CLI nor the file names one.
pub const DEFAULT_PROFILE: &str = "default";

/// Container-runtime substrings looked for in `/proc/<pid>/cgroup`.
pub const DEFAULT_CONTAINER_MARKERS: &[&str] =
    &["docker", "containerd", "libpod", "kubepods", "podman", "lxc"];

/// Root configuration structure for stack.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Container names stopped and removed by `stop`, started by `start`.
    #[serde(default)]
    pub containers: Vec<String>,

    #[serde(default)]
    pub orphans: OrphanConfig,

    #[serde(default)]
    pub termination: TerminationConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ControlPlaneConfig>,

    #[serde(default)]
    pub start: StartConfig,
}

impl Config {
    /// Profile to resolve ports for: explicit override, then file, then default.
    pub fn active_profile(&self, cli_override: Option<&str>) -> String {
        cli_override
            .map(str::to_string)
            .or_else(|| self.profile.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// Every profile name mentioned by any service, plus the default one.
    pub fn known_profiles(&self) -> Vec<String> {
        let mut profiles: Vec<String> = self
            .services
            .iter()
            .flat_map(|s| s.profiles.keys().cloned())
            .chain(self.profile.clone())
            .chain(std::iter::once(DEFAULT_PROFILE.to_string()))
            .collect();
        profiles.sort();
        profiles.dedup();
        profiles
    }
}

/// Inputs for orphan classification.
///
/// Both lists are maintained by hand alongside the service set, so they live
/// in configuration rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrphanConfig {
    /// Command-line substrings identifying this stack's server processes.
    pub signatures: Vec<String>,
    /// cgroup path substrings identifying container-managed processes.
    pub markers: Vec<String>,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            signatures: Vec::new(),
            markers: DEFAULT_CONTAINER_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Escalating termination timings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    /// How long to wait for SIGTERM to take effect.
    pub grace: HumanDuration,
    /// Delay after SIGKILL before the final liveness check.
    pub force_after: HumanDuration,
    /// Liveness polling cadence during the grace period.
    pub poll_interval: HumanDuration,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            grace: HumanDuration::from_secs(3),
            force_after: HumanDuration::from_millis(500),
            poll_interval: HumanDuration::from_millis(100),
        }
    }
}

/// What a probe does when its credential variable is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialPolicy {
    #[default]
    Skip,
    Fail,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Per-probe timeout.
    pub timeout: HumanDuration,
    pub missing_credentials: CredentialPolicy,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout: HumanDuration::from_secs(5),
            missing_credentials: CredentialPolicy::Skip,
        }
    }
}

/// Container runtime CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// `docker` or `podman`.
    pub binary: String,
    pub timeout: HumanDuration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            timeout: HumanDuration::from_secs(30),
        }
    }
}

/// Optional orchestrator control plane (kubectl).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    #[serde(default = "default_kubectl")]
    pub binary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Workload name -> replica count restored by `start`.
    #[serde(default)]
    pub workloads: BTreeMap<String, u32>,
    /// Label selector for pods deleted by `stop`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default = "default_control_plane_timeout")]
    pub timeout: HumanDuration,
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

fn default_control_plane_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

/// Readiness wait used by `start`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StartConfig {
    pub wait: HumanDuration,
    pub interval: HumanDuration,
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            wait: HumanDuration::from_secs(60),
            interval: HumanDuration::from_secs(2),
        }
    }
}
