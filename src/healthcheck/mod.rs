//! Tiered health verification: TCP, HTTP and command probes.

mod checker;
mod command;
mod http;
pub mod report;
mod tcp;
pub mod verifier;

pub use checker::{HealthProbe, ProbeFailure, ProbeResult};
pub use command::CommandProbe;
pub use http::{probe_client, HttpProbe};
pub use report::{HealthCheckResult, HealthReport, Outcome};
pub use tcp::TcpProbe;
pub use verifier::{verify, HealthTarget, VerifyOptions};
