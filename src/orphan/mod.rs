//! Orphan detection and cleanup for host processes holding reserved ports.
//!
//! Discovery is done by [`crate::process`]; this module decides what may be
//! killed ([`classifier`]) and kills it ([`termination`]) through a
//! [`signal::Signaller`].

pub mod classifier;
pub mod signal;
pub mod termination;

pub use classifier::OrphanClassifier;
pub use signal::{Delivery, SignalKind, Signaller, UnixSignaller};
pub use termination::{
    PidTermination, PortResidual, TerminationController, TerminationOutcome, TerminationPolicy,
    TerminationReport,
};

use crate::process::{ContainerMembership, ProcessRecord};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// How a candidate was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedSignal {
    PortMatch,
    PatternMatch,
}

/// Classifier verdict.
///
/// `Unknown` is never terminated; it is surfaced to the operator instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Orphan,
    ContainerManaged,
    Unknown,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Classification::Orphan => "ORPHAN",
            Classification::ContainerManaged => "CONTAINER_MANAGED",
            Classification::Unknown => "UNKNOWN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanCandidate {
    pub process: ProcessRecord,
    pub matched_signal: MatchedSignal,
    pub classification: Classification,
    pub membership: ContainerMembership,
    /// Why the classifier decided what it did.
    pub reason: String,
}

impl OrphanCandidate {
    /// The termination handle for this candidate, only if it is an orphan.
    pub fn target(&self) -> Option<OrphanTarget> {
        (self.classification == Classification::Orphan).then(|| OrphanTarget {
            pid: self.process.pid,
            command_line: self.process.command_line.clone(),
            ports: self.process.owning_ports.clone(),
        })
    }
}

/// A process cleared for termination.
///
/// Only obtainable from an [`OrphanCandidate`] classified `Orphan`, so the
/// termination controller cannot be handed anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanTarget {
    pid: u32,
    command_line: String,
    ports: BTreeSet<u16>,
}

impl OrphanTarget {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn ports(&self) -> &BTreeSet<u16> {
        &self.ports
    }
}

/// Termination handles for every orphan in `candidates`.
pub fn termination_targets(candidates: &[OrphanCandidate]) -> Vec<OrphanTarget> {
    candidates.iter().filter_map(OrphanCandidate::target).collect()
}
