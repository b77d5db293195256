//! In-memory stand-ins for the process table, the kernel and the container
//! runtime, shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use stack_reconcile::cluster::ControlPlane;
use stack_reconcile::config::{Config, ServiceConfig, Tier};
use stack_reconcile::error::{Error, Result};
use stack_reconcile::healthcheck::{HealthProbe, ProbeFailure, ProbeResult};
use stack_reconcile::orphan::{Delivery, SignalKind, Signaller};
use stack_reconcile::process::{ContainerMembership, ProcessInspector, ProcessRecord};
use stack_reconcile::runtime::{ContainerRuntime, ContainerState, ContainerStatus, RuntimeError};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// Fake host: process table + signal delivery
// =============================================================================

#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub record: ProcessRecord,
    pub membership: ContainerMembership,
    pub ignores_term: bool,
    pub ignores_kill: bool,
    /// Fail delivery with this reason, as for a protected PID or EPERM.
    pub refuse: Option<String>,
}

impl FakeProcess {
    pub fn host(pid: u32, cmd: &str, ports: &[u16]) -> Self {
        let mut record = ProcessRecord::new(pid, cmd);
        for &port in ports {
            record = record.with_port(port);
        }
        Self {
            record,
            membership: ContainerMembership::Host,
            ignores_term: false,
            ignores_kill: false,
            refuse: None,
        }
    }

    pub fn in_container(pid: u32, cmd: &str, ports: &[u16]) -> Self {
        Self {
            membership: ContainerMembership::Container {
                evidence: format!("/system.slice/docker-{}.scope", pid),
            },
            ..Self::host(pid, cmd, ports)
        }
    }

    pub fn stubborn(mut self) -> Self {
        self.ignores_term = true;
        self
    }

    pub fn unkillable(mut self) -> Self {
        self.ignores_term = true;
        self.ignores_kill = true;
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.membership = ContainerMembership::Unknown {
            reason: "permission denied".to_string(),
        };
        self
    }
}

#[derive(Default)]
struct HostState {
    processes: BTreeMap<u32, FakeProcess>,
    /// Ports held by something the inspector cannot see.
    hidden_ports: HashSet<u16>,
    signals: Vec<(u32, SignalKind)>,
}

/// Process table and kernel in one, so a delivered signal is visible to
/// the next scan.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
    port_scans: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, process: FakeProcess) {
        self.state
            .lock()
            .processes
            .insert(process.record.pid, process);
    }

    pub fn exit(&self, pid: u32) {
        self.state.lock().processes.remove(&pid);
    }

    pub fn hold_hidden(&self, port: u16) {
        self.state.lock().hidden_ports.insert(port);
    }

    pub fn alive(&self, pid: u32) -> bool {
        self.state.lock().processes.contains_key(&pid)
    }

    /// Number of `processes_on_port` calls so far.
    pub fn port_scans(&self) -> usize {
        self.port_scans.load(Ordering::SeqCst)
    }

    pub fn signals(&self) -> Vec<(u32, SignalKind)> {
        self.state.lock().signals.clone()
    }

    pub fn signals_to(&self, pid: u32) -> Vec<SignalKind> {
        self.state
            .lock()
            .signals
            .iter()
            .filter(|(p, _)| *p == pid)
            .map(|(_, s)| *s)
            .collect()
    }
}

#[async_trait]
impl ProcessInspector for FakeHost {
    async fn processes_on_port(&self, port: u16) -> Vec<ProcessRecord> {
        self.port_scans.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .processes
            .values()
            .filter(|p| p.record.owning_ports.contains(&port))
            .map(|p| {
                let mut record = p.record.clone();
                record.owning_ports.clear();
                record.with_port(port)
            })
            .collect()
    }

    async fn processes_matching_pattern(&self, pattern: &str) -> Vec<ProcessRecord> {
        self.state
            .lock()
            .processes
            .values()
            .filter(|p| p.record.command_line.contains(pattern))
            .map(|p| ProcessRecord::new(p.record.pid, p.record.command_line.clone()))
            .collect()
    }

    async fn container_membership(&self, pid: u32) -> ContainerMembership {
        match self.state.lock().processes.get(&pid) {
            Some(p) => p.membership.clone(),
            None => ContainerMembership::Unknown {
                reason: "process exited".to_string(),
            },
        }
    }

    fn port_held(&self, port: u16, owners: &[ProcessRecord]) -> bool {
        !owners.is_empty() || self.state.lock().hidden_ports.contains(&port)
    }
}

impl Signaller for FakeHost {
    fn send(&self, pid: u32, signal: SignalKind) -> Result<Delivery> {
        let mut state = self.state.lock();
        state.signals.push((pid, signal));
        let Some(process) = state.processes.get(&pid) else {
            return Ok(Delivery::NoSuchProcess);
        };
        if let Some(reason) = &process.refuse {
            return Err(Error::InvalidPid {
                pid,
                reason: reason.clone(),
            });
        }
        let dies = match signal {
            SignalKind::Terminate => !process.ignores_term,
            SignalKind::Kill => !process.ignores_kill,
        };
        if dies {
            state.processes.remove(&pid);
        }
        Ok(Delivery::Sent)
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.alive(pid)
    }
}

// =============================================================================
// Fake container runtime and control plane
// =============================================================================

#[derive(Default)]
pub struct FakeRuntime {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    absent: HashSet<String>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call for `name` fails with a non-zero exit.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// `list` reports `name` as missing.
    pub fn absent(mut self, name: &str) -> Self {
        self.absent.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, verb: &str, name: &str) -> std::result::Result<(), RuntimeError> {
        self.calls.lock().push(format!("{} {}", verb, name));
        if self.failing.contains(name) {
            return Err(RuntimeError::CommandFailed {
                command: format!("docker {} {}", verb, name),
                stderr: "permission denied while trying to connect".to_string(),
                exit_code: Some(1),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list(&self, names: &[String]) -> std::result::Result<Vec<ContainerState>, RuntimeError> {
        Ok(names
            .iter()
            .map(|name| ContainerState {
                name: name.clone(),
                status: if self.absent.contains(name) {
                    ContainerStatus::Missing
                } else {
                    ContainerStatus::Running
                },
            })
            .collect())
    }

    async fn start(&self, name: &str) -> std::result::Result<(), RuntimeError> {
        self.record("start", name)
    }

    async fn stop(&self, name: &str) -> std::result::Result<(), RuntimeError> {
        self.record("stop", name)
    }

    async fn remove(&self, name: &str) -> std::result::Result<(), RuntimeError> {
        self.record("rm", name)
    }
}

#[derive(Default)]
pub struct FakeControlPlane {
    calls: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn scale(&self, workload: &str, replicas: u32) -> std::result::Result<(), RuntimeError> {
        self.calls
            .lock()
            .push(format!("scale {}={}", workload, replicas));
        Ok(())
    }

    async fn delete_pods(&self, selector: &str) -> std::result::Result<(), RuntimeError> {
        self.calls.lock().push(format!("delete {}", selector));
        Ok(())
    }
}

// =============================================================================
// Probes
// =============================================================================

/// Passes or fails with a fixed answer.
pub struct StaticProbe {
    target: String,
    result: ProbeResult,
}

impl StaticProbe {
    pub fn up(target: &str) -> Self {
        Self {
            target: target.to_string(),
            result: Ok("connected".to_string()),
        }
    }

    pub fn down(target: &str) -> Self {
        Self {
            target: target.to_string(),
            result: Err(ProbeFailure::Unreachable("connection refused".to_string())),
        }
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    async fn check(&self, _timeout: Duration) -> ProbeResult {
        self.result.clone()
    }

    fn target(&self) -> &str {
        &self.target
    }
}

/// Never answers; only the verifier's timeout ends it.
pub struct HangingProbe(pub String);

#[async_trait]
impl HealthProbe for HangingProbe {
    async fn check(&self, _timeout: Duration) -> ProbeResult {
        std::future::pending::<()>().await;
        Ok("unreachable".to_string())
    }

    fn target(&self) -> &str {
        &self.0
    }
}

/// Fails the first `failures` checks, then passes.
pub struct FlakyProbe {
    target: String,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyProbe {
    pub fn new(target: &str, failures: usize) -> Self {
        Self {
            target: target.to_string(),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for FlakyProbe {
    async fn check(&self, _timeout: Duration) -> ProbeResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(ProbeFailure::Unreachable("connection refused".to_string()))
        } else {
            Ok("connected".to_string())
        }
    }

    fn target(&self) -> &str {
        &self.target
    }
}

// =============================================================================
// Config helpers
// =============================================================================

pub fn service(name: &str, port: u16, tier: Tier) -> ServiceConfig {
    ServiceConfig {
        name: name.to_string(),
        port,
        tier,
        profiles: BTreeMap::new(),
        probe: None,
    }
}

/// A cache, an API and an optional dashboard on high test ports.
pub fn stack_config() -> Config {
    let mut config = Config {
        services: vec![
            service("cache", 46379, Tier::Infra),
            service("api", 48091, Tier::Required),
            service("dashboard", 43000, Tier::Optional),
        ],
        containers: vec!["stack-cache".to_string(), "stack-db".to_string()],
        ..Config::default()
    };
    config.orphans.signatures = vec!["stack-api".to_string()];
    config.termination.grace = Duration::from_millis(200).into();
    config.termination.force_after = Duration::from_millis(20).into();
    config.termination.poll_interval = Duration::from_millis(10).into();
    config
}
