//! Conservative orphan classification.
//!
//! Rules, evaluated per candidate:
//! 1. container membership positive -> `ContainerManaged`
//! 2. command line contains a configured stack signature -> `Orphan`
//! 3. anything else -> `Unknown` (left alone, reported for manual action)
//!
//! Leaving a real orphan alive is preferred over killing an unrelated
//! process that happens to hold a port.

use super::{Classification, MatchedSignal, OrphanCandidate};
use crate::process::{ContainerMembership, ProcessInspector, ProcessRecord};
use futures::future::join_all;
use std::sync::Arc;

pub struct OrphanClassifier {
    signatures: Vec<String>,
    inspector: Arc<dyn ProcessInspector>,
}

impl OrphanClassifier {
    pub fn new(signatures: Vec<String>, inspector: Arc<dyn ProcessInspector>) -> Self {
        let signatures = signatures
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        Self {
            signatures,
            inspector,
        }
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    /// Classify every record; membership lookups run concurrently.
    #[tracing::instrument(skip_all, fields(candidates = records.len()))]
    pub async fn classify(&self, records: Vec<ProcessRecord>) -> Vec<OrphanCandidate> {
        let memberships = join_all(
            records
                .iter()
                .map(|r| self.inspector.container_membership(r.pid)),
        )
        .await;

        records
            .into_iter()
            .zip(memberships)
            .map(|(process, membership)| {
                let (classification, reason) =
                    decide(&membership, &process.command_line, &self.signatures);
                let matched_signal = if process.owning_ports.is_empty() {
                    MatchedSignal::PatternMatch
                } else {
                    MatchedSignal::PortMatch
                };

                match classification {
                    Classification::Unknown => tracing::warn!(
                        "PID {} ({}) holds {:?} but matches no stack signature; leaving it alone",
                        process.pid,
                        process.command_line,
                        process.owning_ports
                    ),
                    _ => tracing::debug!(
                        "PID {} classified {}: {}",
                        process.pid,
                        classification,
                        reason
                    ),
                }

                OrphanCandidate {
                    process,
                    matched_signal,
                    classification,
                    membership,
                    reason,
                }
            })
            .collect()
    }
}

/// The decision rule, separated from I/O.
pub fn decide(
    membership: &ContainerMembership,
    command_line: &str,
    signatures: &[String],
) -> (Classification, String) {
    if let ContainerMembership::Container { evidence } = membership {
        return (
            Classification::ContainerManaged,
            format!("cgroup {}", evidence),
        );
    }

    if let Some(signature) = signatures
        .iter()
        .find(|s| !s.is_empty() && command_line.contains(s.as_str()))
    {
        return (
            Classification::Orphan,
            format!("host process matching signature '{}'", signature),
        );
    }

    let reason = match membership {
        ContainerMembership::Unknown { reason } => {
            format!("no stack signature; cgroup unreadable ({})", reason)
        }
        _ => "no stack signature matched".to_string(),
    };
    (Classification::Unknown, reason)
}
