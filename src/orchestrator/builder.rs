use super::Orchestrator;
use crate::cluster::{ControlPlane, KubectlClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::healthcheck::{probe_client, HealthTarget};
use crate::orphan::{Signaller, UnixSignaller};
use crate::port::PortRegistry;
use crate::process::{ProcFsInspector, ProcessInspector};
use crate::runtime::{ContainerRuntime, DockerClient};
use std::sync::Arc;
use std::time::Duration;

/// Builder for constructing an `Orchestrator` with a fluent API.
///
/// Validates the configuration, resolves the port registry for the active
/// profile and wires the default collaborators (`docker`, `kubectl`,
/// `/proc`, `kill(2)`). Every collaborator can be replaced, which is how the
/// tests run without touching real processes.
///
/// # Example
///
/// ```no_run
/// use stack_reconcile::{Config, Orchestrator};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), stack_reconcile::Error> {
/// let orchestrator = Orchestrator::builder()
///     .config(Config::default())
///     .profile(Some("staging".to_string()))
///     .health_timeout(Duration::from_secs(2))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    config: Option<Config>,
    profile: Option<String>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    control_plane: Option<Arc<dyn ControlPlane>>,
    inspector: Option<Arc<dyn ProcessInspector>>,
    signaller: Option<Arc<dyn Signaller>>,
    health_targets: Option<Vec<HealthTarget>>,
    health_timeout: Option<Duration>,
    start_wait: Option<Duration>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            profile: None,
            runtime: None,
            control_plane: None,
            inspector: None,
            signaller: None,
            health_targets: None,
            health_timeout: None,
            start_wait: None,
        }
    }

    /// Set the configuration.
    ///
    /// This is required to build the orchestrator.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the profile named in the config file.
    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Replace the kubectl client built from `control_plane:`.
    pub fn control_plane(mut self, control_plane: Arc<dyn ControlPlane>) -> Self {
        self.control_plane = Some(control_plane);
        self
    }

    pub fn inspector(mut self, inspector: Arc<dyn ProcessInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn signaller(mut self, signaller: Arc<dyn Signaller>) -> Self {
        self.signaller = Some(signaller);
        self
    }

    /// Probe these targets instead of the ones derived from `services:`.
    pub fn health_targets(mut self, targets: Vec<HealthTarget>) -> Self {
        self.health_targets = Some(targets);
        self
    }

    /// Per-probe timeout; defaults to `health.timeout`.
    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = Some(timeout);
        self
    }

    /// Readiness deadline for `start`; defaults to `start.wait`.
    pub fn start_wait(mut self, wait: Duration) -> Self {
        self.start_wait = Some(wait);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Config is not set
    /// - Config fails validation
    /// - A probe URL cannot be turned into an HTTP probe
    pub fn build(self) -> Result<Orchestrator> {
        let config = self
            .config
            .ok_or_else(|| Error::Validation("config is required".to_string()))?;
        config.validate()?;

        let profile = config.active_profile(self.profile.as_deref());
        let registry = PortRegistry::from_config(&config, &profile)?;

        let health_targets = match self.health_targets {
            Some(targets) => targets,
            None => targets_from_config(&config, &registry)?,
        };

        let runtime = self
            .runtime
            .unwrap_or_else(|| Arc::new(DockerClient::from_config(&config.runtime)));
        let control_plane = self.control_plane.or_else(|| {
            config
                .control_plane
                .as_ref()
                .map(|cp| Arc::new(KubectlClient::from_config(cp)) as Arc<dyn ControlPlane>)
        });
        let inspector = self.inspector.unwrap_or_else(|| {
            Arc::new(ProcFsInspector::new(config.orphans.markers.clone()))
        });
        let signaller = self
            .signaller
            .unwrap_or_else(|| Arc::new(UnixSignaller::new()));

        let health_timeout = self
            .health_timeout
            .unwrap_or_else(|| config.health.timeout.get());
        let mut start = config.start;
        if let Some(wait) = self.start_wait {
            start.wait = wait.into();
        }

        tracing::debug!(
            "Orchestrator ready: profile '{}', {} port(s), {} probe(s)",
            profile,
            registry.len(),
            health_targets.len()
        );

        Ok(Orchestrator::from_parts(
            config,
            registry,
            runtime,
            control_plane,
            inspector,
            signaller,
            health_targets,
            health_timeout,
            start,
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One probe per registered service, in declaration order.
fn targets_from_config(config: &Config, registry: &PortRegistry) -> Result<Vec<HealthTarget>> {
    let client = probe_client()?;
    registry
        .all_ports(None)
        .into_iter()
        .filter_map(|entry| {
            config
                .services
                .iter()
                .find(|s| s.name == entry.name)
                .map(|service| (entry, service))
        })
        .map(|(entry, service)| {
            let spec = service.probe_for(registry.profile());
            HealthTarget::from_spec(entry.name.clone(), entry.tier, &spec, &client)
        })
        .collect()
}
