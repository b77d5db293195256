//! Service declarations: name, reserved port, tier and health probe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How critical a service is to overall stack readiness.
///
/// Declaration order is the reporting order: INFRA, then REQUIRED, then
/// OPTIONAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Infra,
    Required,
    Optional,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Infra, Tier::Required, Tier::Optional];

    /// Failures in this tier affect the aggregate exit decision.
    pub fn is_critical(self) -> bool {
        !matches!(self, Tier::Optional)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Infra => "INFRA",
            Tier::Required => "REQUIRED",
            Tier::Optional => "OPTIONAL",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health probe declared for a service.
///
/// ```yaml
/// probe: { tcp: "127.0.0.1:6379" }
///
/// probe:
///   http: "http://127.0.0.1:8091/health"
///   api_key_env: STACK_API_KEY
///
/// probe: { command: "test -f /tmp/ready" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeSpec {
    Http {
        http: String,
        /// Environment variable holding a bearer token for the request.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key_env: Option<String>,
    },
    Tcp {
        tcp: String,
    },
    Command {
        command: String,
    },
}

impl ProbeSpec {
    /// Human-readable target used in report lines.
    pub fn target(&self) -> &str {
        match self {
            ProbeSpec::Http { http, .. } => http,
            ProbeSpec::Tcp { tcp } => tcp,
            ProbeSpec::Command { command } => command,
        }
    }
}

/// One entry of the `services:` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub port: u16,
    pub tier: Tier,

    /// Per-profile port overrides, e.g. `{ staging: 18091 }`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, u16>,

    /// Defaults to a TCP probe against `127.0.0.1:<port>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeSpec>,
}

impl ServiceConfig {
    /// Port reserved by this service under `profile`.
    pub fn port_for(&self, profile: &str) -> u16 {
        self.profiles.get(profile).copied().unwrap_or(self.port)
    }

    /// The declared probe, or the default TCP probe on the profile's port.
    pub fn probe_for(&self, profile: &str) -> ProbeSpec {
        self.probe.clone().unwrap_or_else(|| ProbeSpec::Tcp {
            tcp: format!("127.0.0.1:{}", self.port_for(profile)),
        })
    }
}
