//! Escalating termination: SIGTERM, bounded wait, one SIGKILL, final check.
//!
//! Every target is driven concurrently, so the wall-clock cost of a stop is
//! one escalation window rather than one per process.

use super::signal::{Delivery, SignalKind, Signaller};
use super::OrphanTarget;
use crate::config::TerminationConfig;
use crate::error::Error;
use crate::process::{ProcessInspector, ProcessRecord};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub grace: Duration,
    pub force_after: Duration,
    pub poll_interval: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::from(&TerminationConfig::default())
    }
}

impl From<&TerminationConfig> for TerminationPolicy {
    fn from(config: &TerminationConfig) -> Self {
        Self {
            grace: config.grace.get(),
            force_after: config.force_after.get(),
            poll_interval: config.poll_interval.get(),
        }
    }
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TerminationOutcome {
    /// Gone before the first signal.
    AlreadyGone,
    /// Exited within the grace period after SIGTERM.
    Terminated,
    /// Needed SIGKILL.
    Killed,
    /// Still alive after SIGKILL.
    Survived,
    /// Signal could not be delivered (protected PID, permission denied).
    Refused { reason: String },
}

impl TerminationOutcome {
    /// Whether the process is gone now.
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            TerminationOutcome::AlreadyGone
                | TerminationOutcome::Terminated
                | TerminationOutcome::Killed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PidTermination {
    pub pid: u32,
    pub command_line: String,
    #[serde(flatten)]
    pub outcome: TerminationOutcome,
}

/// A reserved port still occupied after termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortResidual {
    pub port: u16,
    /// Owners the inspector could see. Empty when the port is held by
    /// something the inspector has no access to.
    pub owners: Vec<ProcessRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    /// PIDs signalled by this run that are now gone.
    pub killed: BTreeSet<u32>,
    /// PIDs that could not be removed.
    pub still_alive: BTreeSet<u32>,
    pub outcomes: Vec<PidTermination>,
    /// Ports still in use after the re-scan.
    pub residual: Vec<PortResidual>,
}

impl TerminationReport {
    pub fn ports_clear(&self) -> bool {
        self.residual.is_empty()
    }

    pub fn residual_for(&self, port: u16) -> Option<&PortResidual> {
        self.residual.iter().find(|r| r.port == port)
    }
}

pub struct TerminationController {
    signaller: Arc<dyn Signaller>,
    inspector: Arc<dyn ProcessInspector>,
    policy: TerminationPolicy,
}

impl TerminationController {
    pub fn new(
        signaller: Arc<dyn Signaller>,
        inspector: Arc<dyn ProcessInspector>,
        policy: TerminationPolicy,
    ) -> Self {
        Self {
            signaller,
            inspector,
            policy,
        }
    }

    pub fn policy(&self) -> &TerminationPolicy {
        &self.policy
    }

    /// Terminate `targets`, then re-scan `ports`.
    ///
    /// The re-scan always runs, even with no targets, so callers learn about
    /// ports held by processes that were never candidates.
    #[tracing::instrument(skip_all, fields(targets = targets.len(), ports = ports.len()))]
    pub async fn terminate(&self, targets: Vec<OrphanTarget>, ports: &[u16]) -> TerminationReport {
        let outcomes = join_all(targets.iter().map(|t| self.terminate_one(t))).await;

        let mut report = TerminationReport::default();
        for result in outcomes {
            if result.outcome.is_gone() {
                if result.outcome != TerminationOutcome::AlreadyGone {
                    report.killed.insert(result.pid);
                }
            } else {
                report.still_alive.insert(result.pid);
            }
            report.outcomes.push(result);
        }

        report.residual = residual_ports(self.inspector.as_ref(), ports).await;
        report
    }

    async fn terminate_one(&self, target: &OrphanTarget) -> PidTermination {
        let pid = target.pid();
        let outcome = self.escalate(pid).await;
        match &outcome {
            TerminationOutcome::Survived => tracing::error!(
                "PID {} ({}) survived SIGKILL",
                pid,
                target.command_line()
            ),
            TerminationOutcome::Refused { reason } => {
                tracing::warn!("Not terminating PID {}: {}", pid, reason)
            }
            other => tracing::info!("PID {} ({}): {:?}", pid, target.command_line(), other),
        }
        PidTermination {
            pid,
            command_line: target.command_line().to_string(),
            outcome,
        }
    }

    async fn escalate(&self, pid: u32) -> TerminationOutcome {
        match self.signaller.send(pid, SignalKind::Terminate) {
            Ok(Delivery::NoSuchProcess) => return TerminationOutcome::AlreadyGone,
            Ok(Delivery::Sent) => {}
            Err(e) => return refused(e),
        }

        if self.wait_for_exit(pid, self.policy.grace).await {
            return TerminationOutcome::Terminated;
        }

        tracing::debug!(
            "PID {} still alive after {:?}, sending SIGKILL",
            pid,
            self.policy.grace
        );
        match self.signaller.send(pid, SignalKind::Kill) {
            // exited between the last poll and the kill
            Ok(Delivery::NoSuchProcess) => return TerminationOutcome::Terminated,
            Ok(Delivery::Sent) => {}
            Err(e) => return refused(e),
        }

        tokio::time::sleep(self.policy.force_after).await;
        if self.signaller.is_alive(pid) {
            TerminationOutcome::Survived
        } else {
            TerminationOutcome::Killed
        }
    }

    /// Poll liveness until `pid` is gone or `grace` elapses.
    async fn wait_for_exit(&self, pid: u32, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            if !self.signaller.is_alive(pid) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let step = self.policy.poll_interval.min(deadline - now);
            tokio::time::sleep(step).await;
        }
    }
}

fn refused(error: Error) -> TerminationOutcome {
    let reason = match error {
        Error::InvalidPid { reason, .. } => reason,
        other => other.to_string(),
    };
    TerminationOutcome::Refused { reason }
}

/// Ports in `ports` that are still occupied, with any visible owners.
///
/// A port counts as occupied when the inspector sees an owner or when a
/// bind fails with address-in-use. Each port is scanned once.
pub async fn residual_ports(inspector: &dyn ProcessInspector, ports: &[u16]) -> Vec<PortResidual> {
    let scans = join_all(ports.iter().map(|&port| async move {
        let owners = inspector.processes_on_port(port).await;
        let occupied = inspector.port_held(port, &owners);
        occupied.then_some(PortResidual { port, owners })
    }))
    .await;
    scans.into_iter().flatten().collect()
}
