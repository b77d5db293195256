use crate::cluster::ControlPlane;
use crate::config::{Config, StartConfig};
use crate::error::{Error, Result};
use crate::healthcheck::{HealthTarget, VerifyOptions};
use crate::orphan::{OrphanClassifier, Signaller, TerminationController, TerminationPolicy};
use crate::port::PortRegistry;
use crate::process::ProcessInspector;
use crate::runtime::ContainerRuntime;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of one container-runtime or control-plane call.
///
/// Failures are recorded here and never abort the surrounding operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalAction {
    /// e.g. `stop stack-db` or `scale deployment/api=0`.
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExternalAction {
    pub(super) fn from_result<E: std::fmt::Display>(
        action: String,
        result: std::result::Result<(), E>,
    ) -> Self {
        let error = match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("{} failed: {}", action, e);
                Some(e.to_string())
            }
        };
        Self { action, error }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Sequences container stop, orphan reclamation and health verification for
/// one stack.
///
/// Holds no state between operations other than its configuration; every
/// call rescans the process table and re-probes every endpoint, so any
/// operation may be repeated after a partial failure or cancellation.
///
/// # Example
///
/// ```no_run
/// use stack_reconcile::{Config, Orchestrator};
///
/// # async fn example() -> Result<(), stack_reconcile::Error> {
/// let config = Config::default(); // Load from stack.yaml in practice
/// let orchestrator = Orchestrator::builder().config(config).build()?;
///
/// let report = orchestrator.stop_all().await?;
/// std::process::exit(report.exit_code());
/// # }
/// ```
pub struct Orchestrator {
    pub(super) config: Config,
    pub(super) registry: PortRegistry,
    pub(super) runtime: Arc<dyn ContainerRuntime>,
    pub(super) control_plane: Option<Arc<dyn ControlPlane>>,
    pub(super) inspector: Arc<dyn ProcessInspector>,
    pub(super) signaller: Arc<dyn Signaller>,
    pub(super) health_targets: Vec<HealthTarget>,
    pub(super) health_timeout: Duration,
    pub(super) start: StartConfig,
    cancellation_token: CancellationToken,
}

impl Orchestrator {
    /// Create a builder for constructing an `Orchestrator`.
    pub fn builder() -> super::OrchestratorBuilder {
        super::OrchestratorBuilder::new()
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn from_parts(
        config: Config,
        registry: PortRegistry,
        runtime: Arc<dyn ContainerRuntime>,
        control_plane: Option<Arc<dyn ControlPlane>>,
        inspector: Arc<dyn ProcessInspector>,
        signaller: Arc<dyn Signaller>,
        health_targets: Vec<HealthTarget>,
        health_timeout: Duration,
        start: StartConfig,
    ) -> Self {
        Self {
            config,
            registry,
            runtime,
            control_plane,
            inspector,
            signaller,
            health_targets,
            health_timeout,
            start,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &PortRegistry {
        &self.registry
    }

    pub fn health_targets(&self) -> &[HealthTarget] {
        &self.health_targets
    }

    /// Cancel in-progress operations.
    ///
    /// Operations stop at the next phase boundary or bounded wait and return
    /// `Error::Cancelled`. Signals already delivered are not undone.
    pub fn cancel_operations(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Token shared with signal handlers; cancelling it cancels operations.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub(super) fn classifier(&self) -> OrphanClassifier {
        OrphanClassifier::new(
            self.config.orphans.signatures.clone(),
            Arc::clone(&self.inspector),
        )
    }

    pub(super) fn termination_controller(&self) -> TerminationController {
        TerminationController::new(
            Arc::clone(&self.signaller),
            Arc::clone(&self.inspector),
            TerminationPolicy::from(&self.config.termination),
        )
    }

    pub(super) fn verify_options(&self, include_optional: bool) -> VerifyOptions {
        VerifyOptions {
            per_probe_timeout: self.health_timeout,
            include_optional,
            missing_credentials: self.config.health.missing_credentials,
        }
    }

    /// Run `fut` unless cancelled first; cancellation mid-flight drops it.
    pub(super) async fn cancellable<F: Future>(&self, phase: &str, fut: F) -> Result<F::Output> {
        if self.cancellation_token.is_cancelled() {
            return Err(Error::Cancelled(phase.to_string()));
        }
        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => {
                tracing::warn!("Cancelled during {}", phase);
                Err(Error::Cancelled(phase.to_string()))
            }
            output = fut => Ok(output),
        }
    }
}
