use super::{Config, ProbeSpec};
use crate::error::{Error, Result};
use crate::port::PortRegistry;
use std::collections::HashSet;
use std::time::Duration;

impl Config {
    /// Validate the configuration.
    ///
    /// Runs before any scanning; a failure here aborts the invocation.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(Error::Validation(
                    "Service with an empty name".to_string(),
                ));
            }
            if !names.insert(service.name.as_str()) {
                return Err(Error::Validation(format!(
                    "Service '{}' is declared more than once",
                    service.name
                )));
            }
            if let Some(ref probe) = service.probe {
                validate_probe(&service.name, probe)?;
            }
        }

        // Registry construction enforces unique, non-zero ports per profile.
        for profile in self.known_profiles() {
            PortRegistry::from_config(self, &profile)?;
        }

        if self.orphans.markers.iter().all(|m| m.trim().is_empty()) {
            return Err(Error::Validation(
                "orphans.markers must name at least one container runtime marker".to_string(),
            ));
        }
        if self.orphans.signatures.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::Validation(
                "orphans.signatures must not contain empty entries (they would match every process)"
                    .to_string(),
            ));
        }

        for (field, value) in [
            ("termination.poll_interval", self.termination.poll_interval.get()),
            ("health.timeout", self.health.timeout.get()),
            ("runtime.timeout", self.runtime.timeout.get()),
            ("start.interval", self.start.interval.get()),
        ] {
            if value == Duration::ZERO {
                return Err(Error::Validation(format!("{} must be greater than zero", field)));
            }
        }

        if let Some(ref cp) = self.control_plane {
            if cp.timeout.get() == Duration::ZERO {
                return Err(Error::Validation(
                    "control_plane.timeout must be greater than zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Check that a probe target is well-formed.
pub fn validate_probe(label: &str, probe: &ProbeSpec) -> Result<()> {
    let invalid = |reason: String| Error::InvalidProbe {
        label: label.to_string(),
        reason,
    };

    match probe {
        ProbeSpec::Http { http, api_key_env } => {
            let parsed = url::Url::parse(http)
                .map_err(|e| invalid(format!("invalid URL '{}': {}", http, e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(invalid(format!(
                    "scheme must be http or https, got '{}'",
                    parsed.scheme()
                )));
            }
            if matches!(api_key_env, Some(var) if var.trim().is_empty()) {
                return Err(invalid("api_key_env must not be empty".to_string()));
            }
        }
        ProbeSpec::Tcp { tcp } => {
            let (host, port) = tcp
                .rsplit_once(':')
                .ok_or_else(|| invalid(format!("TCP target '{}' must be host:port", tcp)))?;
            if host.is_empty() {
                return Err(invalid(format!("TCP target '{}' has no host", tcp)));
            }
            match port.parse::<u16>() {
                Ok(p) if p != 0 => {}
                _ => return Err(invalid(format!("TCP target '{}' has an invalid port", tcp))),
            }
        }
        ProbeSpec::Command { command } => {
            if command.trim().is_empty() {
                return Err(invalid("command must not be empty".to_string()));
            }
        }
    }

    Ok(())
}
