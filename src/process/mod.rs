//! Process-table inspection: which processes hold a port or match a
//! command-line signature, and whether they run inside a container.
//!
//! Records are ephemeral. They are rebuilt on every scan because a PID may be
//! reused by an unrelated process between two scans.

pub mod procfs;

pub use procfs::ProcFsInspector;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One process observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub command_line: String,
    /// Reserved ports this process was found holding. Empty for records
    /// discovered by signature only.
    pub owning_ports: BTreeSet<u16>,
    pub cgroup_path: Option<String>,
}

impl ProcessRecord {
    pub fn new(pid: u32, command_line: impl Into<String>) -> Self {
        Self {
            pid,
            command_line: command_line.into(),
            owning_ports: BTreeSet::new(),
            cgroup_path: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.owning_ports.insert(port);
        self
    }

    pub fn with_cgroup(mut self, cgroup: impl Into<String>) -> Self {
        self.cgroup_path = Some(cgroup.into());
        self
    }
}

/// Whether a process runs under a container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerMembership {
    /// cgroup path contains a runtime marker; `evidence` is the matching entry.
    Container { evidence: String },
    /// cgroup data was readable and carries no runtime marker.
    Host,
    /// cgroup data could not be read (permission denied, process exited).
    Unknown { reason: String },
}

impl ContainerMembership {
    pub fn is_container(&self) -> bool {
        matches!(self, ContainerMembership::Container { .. })
    }
}

impl fmt::Display for ContainerMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerMembership::Container { evidence } => write!(f, "container ({})", evidence),
            ContainerMembership::Host => f.write_str("host"),
            ContainerMembership::Unknown { reason } => write!(f, "unknown ({})", reason),
        }
    }
}

/// Source of process-table facts.
///
/// Lookups never fail as a whole: a process that vanishes or cannot be read
/// is left out of the result and logged.
#[async_trait]
pub trait ProcessInspector: Send + Sync {
    /// Processes with a listening or established socket bound to `port`.
    /// An unused port yields an empty list.
    async fn processes_on_port(&self, port: u16) -> Vec<ProcessRecord>;

    /// Processes whose command line contains `pattern`.
    async fn processes_matching_pattern(&self, pattern: &str) -> Vec<ProcessRecord>;

    /// Container membership read from the process's control group.
    async fn container_membership(&self, pid: u32) -> ContainerMembership;

    /// Whether `port` is held, given the `owners` this inspector already
    /// found for it. Owners invisible to the inspector are caught by a bind
    /// check; a bind that fails for any reason other than `AddrInUse` falls
    /// back to `owners`.
    fn port_held(&self, port: u16, owners: &[ProcessRecord]) -> bool {
        if !owners.is_empty() {
            return true;
        }
        crate::port::check_bind(port) == crate::port::BindCheck::InUse
    }
}

/// Merge records describing the same PID, unioning their ports.
///
/// Output is ordered by PID.
pub fn merge_records(records: impl IntoIterator<Item = ProcessRecord>) -> Vec<ProcessRecord> {
    let mut merged: BTreeMap<u32, ProcessRecord> = BTreeMap::new();
    for record in records {
        match merged.get_mut(&record.pid) {
            Some(existing) => {
                existing.owning_ports.extend(record.owning_ports);
                if existing.cgroup_path.is_none() {
                    existing.cgroup_path = record.cgroup_path;
                }
            }
            None => {
                merged.insert(record.pid, record);
            }
        }
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_unions_ports_per_pid() {
        let merged = merge_records(vec![
            ProcessRecord::new(20, "api").with_port(8091),
            ProcessRecord::new(10, "cache").with_port(6379),
            ProcessRecord::new(20, "api").with_port(8092),
            ProcessRecord::new(20, "api").with_cgroup("/user.slice"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].pid, 10);
        assert_eq!(merged[1].owning_ports, BTreeSet::from([8091, 8092]));
        assert_eq!(merged[1].cgroup_path.as_deref(), Some("/user.slice"));
    }

    #[test]
    fn membership_display() {
        let m = ContainerMembership::Container {
            evidence: "/docker/abc".to_string(),
        };
        assert!(m.is_container());
        assert_eq!(m.to_string(), "container (/docker/abc)");
        assert!(!ContainerMembership::Host.is_container());
    }
}
