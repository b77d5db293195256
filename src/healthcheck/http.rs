use super::{HealthProbe, ProbeFailure, ProbeResult};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Build the HTTP client shared by every probe of a verification run.
///
/// One client keeps a single connection pool instead of one per service.
/// The client-level timeout is only a backstop; each request sets its own.
/// Redirects are not followed: a 3xx is the health endpoint's own answer.
pub fn probe_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Passes on a 2xx answer to `GET url`.
pub struct HttpProbe {
    url: String,
    api_key_env: Option<String>,
    client: Client,
}

impl HttpProbe {
    /// # Errors
    ///
    /// Returns error if the URL is malformed or not http/https.
    pub fn new(url: String, api_key_env: Option<String>, client: Client) -> Result<Self> {
        Self::validate_url(&url)?;
        Ok(Self {
            url,
            api_key_env,
            client,
        })
    }

    fn validate_url(url: &str) -> Result<()> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Config(format!("Invalid probe URL '{}': {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(Error::Config(format!(
                "Invalid probe URL '{}': scheme must be http or https, got '{}'",
                url, other
            ))),
        }
    }

    /// Bearer token from the configured variable.
    fn credential(&self) -> std::result::Result<Option<String>, ProbeFailure> {
        let Some(var) = &self.api_key_env else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            _ => Err(ProbeFailure::MissingCredential(var.clone())),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self, timeout: Duration) -> ProbeResult {
        let token = self.credential()?;

        let mut request = self.client.get(&self.url).timeout(timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                Ok(format!("HTTP {}", response.status().as_u16()))
            }
            Ok(response) => Err(ProbeFailure::Status(response.status().as_u16())),
            Err(e) if e.is_timeout() => Err(ProbeFailure::Timeout(timeout)),
            Err(e) if e.is_connect() => Err(ProbeFailure::Unreachable(root_cause(&e))),
            Err(e) => Err(ProbeFailure::Other(root_cause(&e))),
        }
    }

    fn target(&self) -> &str {
        &self.url
    }
}

/// Innermost message in the source chain, e.g. the DNS or TLS error behind
/// reqwest's generic "error sending request".
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct SendError(std::io::Error);

    impl fmt::Display for SendError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("error sending request")
        }
    }

    impl std::error::Error for SendError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    fn probe(url: &str, key: Option<&str>) -> Result<HttpProbe> {
        HttpProbe::new(
            url.to_string(),
            key.map(str::to_string),
            probe_client().unwrap(),
        )
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(probe("not-a-url", None).is_err());
        assert!(probe("ftp://localhost/health", None).is_err());
        assert!(probe("http://localhost/health", None).is_ok());
        assert!(probe("https://localhost/health", None).is_ok());
    }

    #[tokio::test]
    async fn unreachable_port_fails() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let p = probe(&format!("http://{}/health", addr), None).unwrap();
        match p.check(Duration::from_secs(1)).await {
            Err(ProbeFailure::Unreachable(cause)) => {
                assert!(cause.to_lowercase().contains("refused"), "got: {}", cause)
            }
            other => panic!("expected unreachable, got {:?}", other),
        }
    }

    #[test]
    fn failure_detail_is_the_innermost_cause() {
        let dns = SendError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "failed to lookup address information: Name or service not known",
        ));
        assert_eq!(
            root_cause(&dns),
            "failed to lookup address information: Name or service not known"
        );
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let p = probe(
            "http://127.0.0.1:9/health",
            Some("STACK_RECONCILE_TEST_UNSET_KEY"),
        )
        .unwrap();
        assert_eq!(
            p.check(Duration::from_secs(1)).await,
            Err(ProbeFailure::MissingCredential(
                "STACK_RECONCILE_TEST_UNSET_KEY".to_string()
            ))
        );
    }
}
