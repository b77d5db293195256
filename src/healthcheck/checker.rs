use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Why a probe did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// No answer within the per-probe timeout.
    Timeout(Duration),
    /// Connection refused or unreachable.
    Unreachable(String),
    /// HTTP answer outside 2xx.
    Status(u16),
    /// Credential variable unset or empty.
    MissingCredential(String),
    /// Command exited non-zero.
    ExitCode(Option<i32>),
    Other(String),
}

impl ProbeFailure {
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, ProbeFailure::MissingCredential(_))
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Timeout(after) => write!(f, "timed out after {:?}", after),
            ProbeFailure::Unreachable(msg) => write!(f, "unreachable: {}", msg),
            ProbeFailure::Status(code) => write!(f, "HTTP {}", code),
            ProbeFailure::MissingCredential(var) => write!(f, "{} not set", var),
            ProbeFailure::ExitCode(Some(code)) => write!(f, "exit code {}", code),
            ProbeFailure::ExitCode(None) => f.write_str("terminated by signal"),
            ProbeFailure::Other(msg) => f.write_str(msg),
        }
    }
}

/// Success detail, e.g. `HTTP 200` or `connected`.
pub type ProbeResult = std::result::Result<String, ProbeFailure>;

/// One readiness check against a service.
///
/// Implementations must honour `timeout` themselves where they can; the
/// verifier also wraps every call in an outer timeout.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, timeout: Duration) -> ProbeResult;

    /// URL, `host:port` or command shown in report lines.
    fn target(&self) -> &str;
}
