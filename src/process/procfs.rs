//! Linux `/proc` backed [`ProcessInspector`].
//!
//! Port ownership is resolved without shelling out: socket inodes bound to the
//! port are read from `net/tcp` and `net/tcp6`, then matched against the
//! `socket:[inode]` links under each `<pid>/fd`. The root is configurable so
//! tests can point the inspector at a fabricated tree.

use super::{ContainerMembership, ProcessInspector, ProcessRecord};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// TCP socket states, as printed in `/proc/net/tcp`.
const TCP_ESTABLISHED: &str = "01";
const TCP_LISTEN: &str = "0A";

#[derive(Debug, Clone)]
pub struct ProcFsInspector {
    root: PathBuf,
    markers: Arc<Vec<String>>,
    self_pid: u32,
}

impl ProcFsInspector {
    pub fn new(markers: Vec<String>) -> Self {
        Self::with_root("/proc", markers)
    }

    pub fn with_root(root: impl Into<PathBuf>, markers: Vec<String>) -> Self {
        Self {
            root: root.into(),
            markers: Arc::new(markers),
            self_pid: std::process::id(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `(visible processes, processes whose fd table is readable)`.
    ///
    /// Fails if the socket table itself cannot be read.
    pub fn access_summary(&self) -> io::Result<(usize, usize)> {
        fs::read_to_string(self.root.join("net/tcp"))?;
        let pids = self.pids();
        let readable = pids
            .iter()
            .filter(|pid| fs::read_dir(self.root.join(pid.to_string()).join("fd")).is_ok())
            .count();
        Ok((pids.len(), readable))
    }

    /// Numeric entries of the process table, excluding our own PID.
    fn pids(&self) -> Vec<u32> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read process table at {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut pids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter(|pid| *pid != self.self_pid)
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Inodes of TCP sockets bound locally to `port` in LISTEN or ESTABLISHED.
    fn socket_inodes(&self, port: u16) -> HashSet<u64> {
        let mut inodes = HashSet::new();
        for table in ["net/tcp", "net/tcp6"] {
            match fs::read_to_string(self.root.join(table)) {
                Ok(content) => inodes.extend(parse_net_tcp(&content, port)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::debug!("Cannot read {}: {}", table, e),
            }
        }
        inodes
    }

    /// Socket inodes referenced by the open file descriptors of `pid`.
    fn open_socket_inodes(&self, pid: u32) -> io::Result<HashSet<u64>> {
        let fd_dir = self.root.join(pid.to_string()).join("fd");
        let mut inodes = HashSet::new();
        for entry in fs::read_dir(fd_dir)? {
            // fds close while we iterate; a missing link is not an error
            let Ok(entry) = entry else { continue };
            if let Ok(target) = fs::read_link(entry.path()) {
                if let Some(inode) = parse_socket_link(&target) {
                    inodes.insert(inode);
                }
            }
        }
        Ok(inodes)
    }

    fn read_command_line(&self, pid: u32) -> io::Result<String> {
        let dir = self.root.join(pid.to_string());
        let raw = fs::read(dir.join("cmdline"))?;
        let cmdline = raw
            .split(|b| *b == 0)
            .filter(|part| !part.is_empty())
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        if !cmdline.is_empty() {
            return Ok(cmdline);
        }
        // Kernel threads and zombies have an empty cmdline
        let comm = fs::read_to_string(dir.join("comm"))?;
        Ok(format!("[{}]", comm.trim()))
    }

    fn read_cgroup(&self, pid: u32) -> io::Result<String> {
        fs::read_to_string(self.root.join(pid.to_string()).join("cgroup"))
    }

    fn read_record(&self, pid: u32) -> io::Result<ProcessRecord> {
        let command_line = self.read_command_line(pid)?;
        let cgroup_path = self.read_cgroup(pid).ok().and_then(|c| cgroup_paths(&c));
        Ok(ProcessRecord {
            pid,
            command_line,
            owning_ports: BTreeSet::new(),
            cgroup_path,
        })
    }

    /// Blocking scan for the owners of `port`.
    pub fn scan_port(&self, port: u16) -> Vec<ProcessRecord> {
        let inodes = self.socket_inodes(port);
        if inodes.is_empty() {
            return Vec::new();
        }

        let mut records = Vec::new();
        for pid in self.pids() {
            let open = match self.open_socket_inodes(pid) {
                Ok(open) => open,
                Err(e) => {
                    log_lookup_miss(pid, &e);
                    continue;
                }
            };
            if open.is_disjoint(&inodes) {
                continue;
            }
            match self.read_record(pid) {
                Ok(record) => records.push(record.with_port(port)),
                Err(e) => log_lookup_miss(pid, &e),
            }
        }
        records
    }

    /// Blocking scan for processes whose command line contains `pattern`.
    pub fn scan_pattern(&self, pattern: &str) -> Vec<ProcessRecord> {
        let mut records = Vec::new();
        for pid in self.pids() {
            let command_line = match self.read_command_line(pid) {
                Ok(cmd) => cmd,
                Err(e) => {
                    log_lookup_miss(pid, &e);
                    continue;
                }
            };
            if !command_line.contains(pattern) {
                continue;
            }
            let cgroup_path = self.read_cgroup(pid).ok().and_then(|c| cgroup_paths(&c));
            records.push(ProcessRecord {
                pid,
                command_line,
                owning_ports: BTreeSet::new(),
                cgroup_path,
            });
        }
        records
    }

    /// Blocking membership lookup.
    pub fn membership(&self, pid: u32) -> ContainerMembership {
        match self.read_cgroup(pid) {
            Ok(content) => membership_from_cgroup(&content, &self.markers),
            Err(e) if e.kind() == io::ErrorKind::NotFound => ContainerMembership::Unknown {
                reason: "process exited".to_string(),
            },
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                ContainerMembership::Unknown {
                    reason: "permission denied".to_string(),
                }
            }
            Err(e) => ContainerMembership::Unknown {
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl ProcessInspector for ProcFsInspector {
    async fn processes_on_port(&self, port: u16) -> Vec<ProcessRecord> {
        let inspector = self.clone();
        tokio::task::spawn_blocking(move || inspector.scan_port(port))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Port {} scan task failed: {}", port, e);
                Vec::new()
            })
    }

    async fn processes_matching_pattern(&self, pattern: &str) -> Vec<ProcessRecord> {
        let inspector = self.clone();
        let pattern = pattern.to_string();
        tokio::task::spawn_blocking(move || inspector.scan_pattern(&pattern))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Signature scan task failed: {}", e);
                Vec::new()
            })
    }

    async fn container_membership(&self, pid: u32) -> ContainerMembership {
        let inspector = self.clone();
        tokio::task::spawn_blocking(move || inspector.membership(pid))
            .await
            .unwrap_or_else(|e| ContainerMembership::Unknown {
                reason: e.to_string(),
            })
    }
}

fn log_lookup_miss(pid: u32, err: &io::Error) {
    match err.kind() {
        io::ErrorKind::NotFound => tracing::debug!("PID {} exited during scan", pid),
        io::ErrorKind::PermissionDenied => {
            tracing::debug!("PID {} not inspectable: permission denied", pid)
        }
        _ => tracing::warn!("Skipping PID {}: {}", pid, err),
    }
}

/// Extract socket inodes bound locally to `port` from a `/proc/net/tcp{,6}`
/// table, keeping only LISTEN and ESTABLISHED sockets.
pub fn parse_net_tcp(content: &str, port: u16) -> HashSet<u64> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // sl local rem st queues timer retrnsmt uid timeout inode ...
            let local = fields.get(1)?;
            let state = fields.get(3)?;
            let inode = fields.get(9)?.parse::<u64>().ok()?;
            let (_, port_hex) = local.rsplit_once(':')?;
            let local_port = u16::from_str_radix(port_hex, 16).ok()?;
            let live = state.eq_ignore_ascii_case(TCP_LISTEN) || *state == TCP_ESTABLISHED;
            (local_port == port && live && inode != 0).then_some(inode)
        })
        .collect()
}

/// `socket:[12345]` -> 12345
fn parse_socket_link(target: &Path) -> Option<u64> {
    target
        .to_str()?
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Paths from a `/proc/<pid>/cgroup` file (`hierarchy:controllers:path`),
/// joined with `;`. `None` when the file lists nothing.
fn cgroup_paths(content: &str) -> Option<String> {
    let mut paths: Vec<&str> = content
        .lines()
        .filter_map(|line| line.splitn(3, ':').nth(2))
        .filter(|path| !path.is_empty())
        .collect();
    paths.dedup();
    (!paths.is_empty()).then(|| paths.join(";"))
}

/// Classify a cgroup file against the configured runtime markers.
pub fn membership_from_cgroup(content: &str, markers: &[String]) -> ContainerMembership {
    if content.trim().is_empty() {
        return ContainerMembership::Unknown {
            reason: "empty cgroup file".to_string(),
        };
    }
    for line in content.lines() {
        let path = line.splitn(3, ':').nth(2).unwrap_or(line);
        if markers
            .iter()
            .any(|marker| !marker.is_empty() && path.contains(marker.as_str()))
        {
            return ContainerMembership::Container {
                evidence: path.to_string(),
            };
        }
    }
    ContainerMembership::Host
}
