//! `stop`: containers first, then host-level reclamation, then a port
//! re-scan that decides the exit code.

use super::{ExternalAction, Orchestrator};
use crate::error::Result;
use crate::orphan::{termination_targets, Classification, OrphanCandidate, TerminationReport};
use crate::port::ServicePort;
use crate::process::{merge_records, ProcessRecord};
use crate::report::{summary_line, LineStatus, ReportLine};
use crate::runtime::ContainerStatus;
use futures::future::join_all;
use serde::Serialize;

/// Final state of one reserved port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCheck {
    pub service: ServicePort,
    pub free: bool,
    /// Owners seen by the inspector while the port was occupied.
    pub owners: Vec<ProcessRecord>,
}

impl PortCheck {
    pub fn line(&self) -> ReportLine {
        let (status, detail) = if self.free {
            (LineStatus::Pass, format!("port {} free", self.service.port))
        } else if self.owners.is_empty() {
            (
                LineStatus::Fail,
                format!(
                    "port {} in use, owner not visible to this user",
                    self.service.port
                ),
            )
        } else {
            let owners = self
                .owners
                .iter()
                .map(|p| format!("pid {} `{}`", p.pid, p.command_line))
                .collect::<Vec<_>>()
                .join(", ");
            (
                LineStatus::Fail,
                format!("port {} held by {}", self.service.port, owners),
            )
        };
        ReportLine::new(
            status,
            Some(self.service.tier),
            self.service.name.clone(),
            detail,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub external: Vec<ExternalAction>,
    pub candidates: Vec<OrphanCandidate>,
    pub termination: TerminationReport,
    pub ports: Vec<PortCheck>,
}

impl StopReport {
    /// Every reserved port is free.
    pub fn is_success(&self) -> bool {
        self.ports.iter().all(|p| p.free)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Nothing needed killing and nothing is left.
    pub fn already_clean(&self) -> bool {
        self.is_success()
            && self.termination.killed.is_empty()
            && self.termination.still_alive.is_empty()
    }

    /// Candidates left alone because ownership could not be established.
    pub fn unknown(&self) -> impl Iterator<Item = &OrphanCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.classification == Classification::Unknown)
    }

    /// WARN lines for unknown candidates and survivors, then one line per port.
    pub fn lines(&self) -> Vec<ReportLine> {
        let mut lines: Vec<ReportLine> = self
            .unknown()
            .map(|c| {
                ReportLine::new(
                    LineStatus::Warn,
                    None,
                    format!("pid {}", c.process.pid),
                    format!(
                        "`{}` on {:?}: {}; not terminated",
                        c.process.command_line, c.process.owning_ports, c.reason
                    ),
                )
            })
            .collect();

        lines.extend(
            self.termination
                .outcomes
                .iter()
                .filter(|o| self.termination.still_alive.contains(&o.pid))
                .map(|o| {
                    ReportLine::new(
                        LineStatus::Warn,
                        None,
                        format!("pid {}", o.pid),
                        format!("`{}` still alive: {:?}", o.command_line, o.outcome),
                    )
                }),
        );

        lines.extend(self.ports.iter().map(PortCheck::line));
        lines
    }

    pub fn summary(&self) -> String {
        let free = self.ports.iter().filter(|p| p.free).count();
        summary_line(free, self.ports.len() - free)
    }
}

impl Orchestrator {
    /// Bring the stack to "fully stopped, all reserved ports free".
    ///
    /// Runtime and control-plane failures are recorded and do not stop the
    /// remaining phases. Running it again on a stopped stack terminates
    /// nothing and succeeds.
    #[tracing::instrument(skip_all, fields(profile = %self.registry.profile()))]
    pub async fn stop_all(&self) -> Result<StopReport> {
        let mut external = self.cancellable("container stop", self.stop_containers()).await?;
        external.extend(
            self.cancellable("control-plane scale-down", self.scale_down())
                .await?,
        );

        let candidates = self.cancellable("process scan", self.plan_stop()).await?;
        let targets = termination_targets(&candidates);
        if !targets.is_empty() {
            tracing::info!("Terminating {} orphan process(es)", targets.len());
        }

        let ports = self.registry.ports();
        let controller = self.termination_controller();
        let termination = self
            .cancellable("termination", controller.terminate(targets, &ports))
            .await?;

        let ports = self
            .registry
            .all_ports(None)
            .into_iter()
            .map(|service| {
                let residual = termination.residual_for(service.port);
                PortCheck {
                    service: service.clone(),
                    free: residual.is_none(),
                    owners: residual.map(|r| r.owners.clone()).unwrap_or_default(),
                }
            })
            .collect();

        let report = StopReport {
            external,
            candidates,
            termination,
            ports,
        };
        if report.is_success() {
            tracing::info!("All {} reserved port(s) free", report.ports.len());
        } else {
            tracing::warn!("Stack not fully stopped: {}", report.summary());
        }
        Ok(report)
    }

    /// Discover and classify, without sending any signal.
    pub async fn plan_stop(&self) -> Vec<OrphanCandidate> {
        let records = self.discover().await;
        self.classifier().classify(records).await
    }

    /// Current owners of every reserved port.
    pub async fn port_status(&self) -> Vec<PortCheck> {
        let inspector = self.inspector.as_ref();
        join_all(self.registry.all_ports(None).into_iter().map(|service| async move {
            let owners = inspector.processes_on_port(service.port).await;
            let free = !inspector.port_held(service.port, &owners);
            PortCheck {
                service: service.clone(),
                free,
                owners,
            }
        }))
        .await
    }

    /// Scan reserved ports and signatures concurrently, merged by PID.
    async fn discover(&self) -> Vec<ProcessRecord> {
        let inspector = self.inspector.as_ref();
        let by_port = join_all(
            self.registry
                .ports()
                .into_iter()
                .map(|port| inspector.processes_on_port(port)),
        );
        let by_pattern = join_all(
            self.config
                .orphans
                .signatures
                .iter()
                .map(|s| inspector.processes_matching_pattern(s)),
        );
        let (by_port, by_pattern) = futures::join!(by_port, by_pattern);

        let records = merge_records(by_port.into_iter().chain(by_pattern).flatten());
        tracing::debug!("Discovered {} candidate process(es)", records.len());
        records
    }

    /// Stop and remove configured containers. Containers the runtime does not
    /// know are skipped; if listing fails every name is attempted.
    async fn stop_containers(&self) -> Vec<ExternalAction> {
        if self.config.containers.is_empty() {
            return Vec::new();
        }
        let runtime = self.runtime.as_ref();
        let names: Vec<String> = match runtime.list(&self.config.containers).await {
            Ok(states) => states
                .into_iter()
                .filter_map(|state| {
                    if state.status == ContainerStatus::Missing {
                        tracing::debug!("Container {} not present, skipping", state.name);
                        None
                    } else {
                        Some(state.name)
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Cannot list containers, stopping all by name: {}", e);
                self.config.containers.clone()
            }
        };
        join_all(names.iter().map(|name| async move {
            let stop = runtime.stop(name).await;
            let stopped = ExternalAction::from_result(format!("stop {}", name), stop);
            // remove even if stop failed; rm -f covers a hung container
            let remove = runtime.remove(name).await;
            let removed = ExternalAction::from_result(format!("remove {}", name), remove);
            [stopped, removed]
        }))
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    async fn scale_down(&self) -> Vec<ExternalAction> {
        let (Some(control_plane), Some(cp_config)) =
            (self.control_plane.as_ref(), self.config.control_plane.as_ref())
        else {
            return Vec::new();
        };

        let mut actions = join_all(cp_config.workloads.keys().map(|workload| async move {
            let result = control_plane.scale(workload, 0).await;
            ExternalAction::from_result(format!("scale {}=0", workload), result)
        }))
        .await;

        if let Some(selector) = &cp_config.selector {
            let result = control_plane.delete_pods(selector).await;
            actions.push(ExternalAction::from_result(
                format!("delete pods -l {}", selector),
                result,
            ));
        }
        actions
    }
}
