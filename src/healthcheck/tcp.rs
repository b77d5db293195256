use super::{HealthProbe, ProbeFailure, ProbeResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;

/// Passes when a TCP connection to `addr` can be opened.
pub struct TcpProbe {
    addr: String,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    async fn check(&self, timeout: Duration) -> ProbeResult {
        match tokio::time::timeout(timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => Ok("connected".to_string()),
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                Err(ProbeFailure::Unreachable("connection refused".to_string()))
            }
            Ok(Err(e)) => Err(ProbeFailure::Unreachable(e.to_string())),
            Err(_) => Err(ProbeFailure::Timeout(timeout)),
        }
    }

    fn target(&self) -> &str {
        &self.addr
    }
}
