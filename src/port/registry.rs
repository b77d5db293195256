//! Static mapping of logical service name to reserved TCP port and tier.
//!
//! Built once per invocation from `stack.yaml` for one deployment profile and
//! never mutated afterwards.

use crate::config::{Config, Tier};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A service's reserved port within one profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
    pub tier: Tier,
}

#[derive(Debug, Clone)]
pub struct PortRegistry {
    profile: String,
    entries: Vec<ServicePort>,
}

impl PortRegistry {
    /// Build a registry, rejecting duplicate names, duplicate ports and port 0.
    pub fn new(profile: impl Into<String>, entries: Vec<ServicePort>) -> Result<Self> {
        let profile = profile.into();
        let mut by_port: HashMap<u16, &str> = HashMap::new();
        let mut names: HashSet<&str> = HashSet::new();

        for entry in &entries {
            if entry.port == 0 {
                return Err(Error::Validation(format!(
                    "Service '{}' reserves port 0 in profile '{}'",
                    entry.name, profile
                )));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(Error::Validation(format!(
                    "Service '{}' is registered twice in profile '{}'",
                    entry.name, profile
                )));
            }
            if let Some(other) = by_port.insert(entry.port, entry.name.as_str()) {
                return Err(Error::Validation(format!(
                    "Port {} is reserved by both '{}' and '{}' in profile '{}'",
                    entry.port, other, entry.name, profile
                )));
            }
        }

        Ok(Self { profile, entries })
    }

    /// Resolve the registry for `profile` from the `services:` list.
    pub fn from_config(config: &Config, profile: &str) -> Result<Self> {
        let entries = config
            .services
            .iter()
            .map(|svc| ServicePort {
                name: svc.name.clone(),
                port: svc.port_for(profile),
                tier: svc.tier,
            })
            .collect();
        Self::new(profile, entries)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn resolve(&self, name: &str) -> Result<&ServicePort> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::UnknownService(name.to_string()))
    }

    /// Entries in declaration order, optionally restricted to one tier.
    pub fn all_ports(&self, tier: Option<Tier>) -> Vec<&ServicePort> {
        self.entries
            .iter()
            .filter(|e| tier.map_or(true, |t| e.tier == t))
            .collect()
    }

    /// Reserved port numbers in declaration order.
    pub fn ports(&self) -> Vec<u16> {
        self.entries.iter().map(|e| e.port).collect()
    }

    pub fn by_port(&self, port: u16) -> Option<&ServicePort> {
        self.entries.iter().find(|e| e.port == port)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
