//! `verify` and `start`: health verification, optionally after bringing
//! containers and workloads up.

use super::{ExternalAction, Orchestrator};
use crate::error::Result;
use crate::healthcheck::{verify, HealthReport};
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReport {
    pub external: Vec<ExternalAction>,
    /// Verification passes run before the report settled.
    pub attempts: u32,
    pub health: HealthReport,
}

impl StartReport {
    pub fn exit_code(&self) -> i32 {
        self.health.exit_code()
    }
}

impl Orchestrator {
    /// Probe every registered service once.
    ///
    /// The exit code is `report.exit_code()`: 0 when no INFRA or REQUIRED
    /// probe failed.
    #[tracing::instrument(skip(self))]
    pub async fn verify_all(&self, include_optional: bool) -> HealthReport {
        verify(&self.health_targets, self.verify_options(include_optional)).await
    }

    /// Start containers and scale workloads up, then re-run verification
    /// every `start.interval` until it succeeds or `start.wait` elapses.
    ///
    /// Runtime failures are recorded and verification still runs, so the
    /// report shows which services never came up.
    #[tracing::instrument(skip(self))]
    pub async fn start_and_verify(&self, include_optional: bool) -> Result<StartReport> {
        let mut external = self
            .cancellable("container start", self.start_containers())
            .await?;
        external.extend(
            self.cancellable("control-plane scale-up", self.scale_up())
                .await?,
        );

        let deadline = Instant::now() + self.start.wait.get();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let health = self
                .cancellable("health verification", self.verify_all(include_optional))
                .await?;

            if health.is_success() || Instant::now() >= deadline {
                if !health.is_success() {
                    tracing::warn!(
                        "Stack not ready after {} attempt(s): {}",
                        attempts,
                        health.summary()
                    );
                }
                return Ok(StartReport {
                    external,
                    attempts,
                    health,
                });
            }

            tracing::debug!(
                "Attempt {}: {} failing, retrying in {}",
                attempts,
                health.fail_count,
                self.start.interval
            );
            let pause = self
                .start
                .interval
                .get()
                .min(deadline.saturating_duration_since(Instant::now()));
            self.cancellable("readiness wait", tokio::time::sleep(pause))
                .await?;
        }
    }

    async fn start_containers(&self) -> Vec<ExternalAction> {
        let runtime = self.runtime.as_ref();
        join_all(self.config.containers.iter().map(|name| async move {
            let result = runtime.start(name).await;
            ExternalAction::from_result(format!("start {}", name), result)
        }))
        .await
    }

    async fn scale_up(&self) -> Vec<ExternalAction> {
        let (Some(control_plane), Some(cp_config)) =
            (self.control_plane.as_ref(), self.config.control_plane.as_ref())
        else {
            return Vec::new();
        };

        join_all(
            cp_config
                .workloads
                .iter()
                .map(|(workload, &replicas)| async move {
                    let result = control_plane.scale(workload, replicas).await;
                    ExternalAction::from_result(
                        format!("scale {}={}", workload, replicas),
                        result,
                    )
                }),
        )
        .await
    }
}
