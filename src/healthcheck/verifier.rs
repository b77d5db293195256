//! Tier-ordered verification with per-probe timeouts.
//!
//! Tiers run one after the other (INFRA, REQUIRED, OPTIONAL) for stable
//! reporting; probes inside a tier run concurrently so a tier costs at most
//! one timeout. A failed tier never stops later tiers from running.

use super::report::{HealthCheckResult, HealthReport, Outcome};
use super::{CommandProbe, HealthProbe, HttpProbe, ProbeFailure, TcpProbe};
use crate::config::{CredentialPolicy, ProbeSpec, Tier};
use crate::error::Result;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// One labelled probe in a tier.
#[derive(Clone)]
pub struct HealthTarget {
    pub label: String,
    pub tier: Tier,
    pub probe: Arc<dyn HealthProbe>,
}

impl HealthTarget {
    pub fn new(label: impl Into<String>, tier: Tier, probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            label: label.into(),
            tier,
            probe,
        }
    }

    /// Build the concrete probe described by `spec`.
    pub fn from_spec(
        label: impl Into<String>,
        tier: Tier,
        spec: &ProbeSpec,
        client: &Client,
    ) -> Result<Self> {
        let probe: Arc<dyn HealthProbe> = match spec {
            ProbeSpec::Http { http, api_key_env } => Arc::new(HttpProbe::new(
                http.clone(),
                api_key_env.clone(),
                client.clone(),
            )?),
            ProbeSpec::Tcp { tcp } => Arc::new(TcpProbe::new(tcp.clone())),
            ProbeSpec::Command { command } => Arc::new(CommandProbe::new(command.clone())),
        };
        Ok(Self::new(label, tier, probe))
    }
}

impl std::fmt::Debug for HealthTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthTarget")
            .field("label", &self.label)
            .field("tier", &self.tier)
            .field("target", &self.probe.target())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    pub per_probe_timeout: Duration,
    pub include_optional: bool,
    pub missing_credentials: CredentialPolicy,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            per_probe_timeout: Duration::from_secs(5),
            include_optional: false,
            missing_credentials: CredentialPolicy::Skip,
        }
    }
}

/// Run every target and aggregate the outcomes.
///
/// Results are ordered by tier, then by the order of `targets` within a tier.
#[tracing::instrument(skip_all, fields(targets = targets.len()))]
pub async fn verify(targets: &[HealthTarget], options: VerifyOptions) -> HealthReport {
    let mut results = Vec::with_capacity(targets.len());

    for tier in Tier::ALL {
        if tier == Tier::Optional && !options.include_optional {
            continue;
        }
        let group: Vec<&HealthTarget> = targets.iter().filter(|t| t.tier == tier).collect();
        if group.is_empty() {
            continue;
        }

        tracing::debug!("Probing {} {} target(s)", group.len(), tier);
        let tier_results = join_all(group.into_iter().map(|t| run_probe(t, &options))).await;
        results.extend(tier_results);
    }

    let report = HealthReport::from_results(results);
    tracing::info!(
        "Health verification: {} passed, {} failed, {} skipped",
        report.pass_count,
        report.fail_count,
        report.skip_count
    );
    report
}

async fn run_probe(target: &HealthTarget, options: &VerifyOptions) -> HealthCheckResult {
    let timeout = options.per_probe_timeout;
    let result = match tokio::time::timeout(timeout, target.probe.check(timeout)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeFailure::Timeout(timeout)),
    };

    let (outcome, detail) = match result {
        Ok(detail) => (Outcome::Pass, detail),
        Err(failure) => {
            let outcome = failure_outcome(target.tier, &failure, options.missing_credentials);
            (outcome, format!("{}: {}", target.probe.target(), failure))
        }
    };

    match outcome {
        Outcome::Fail => tracing::warn!("{} [{}] failed: {}", target.label, target.tier, detail),
        _ => tracing::debug!("{} [{}] {:?}: {}", target.label, target.tier, outcome, detail),
    }

    HealthCheckResult {
        label: target.label.clone(),
        tier: target.tier,
        outcome,
        detail,
    }
}

/// OPTIONAL failures are advisory; missing credentials follow `policy`.
fn failure_outcome(tier: Tier, failure: &ProbeFailure, policy: CredentialPolicy) -> Outcome {
    if !tier.is_critical() {
        return Outcome::Skip;
    }
    match (failure.is_missing_credential(), policy) {
        (true, CredentialPolicy::Skip) => Outcome::Skip,
        _ => Outcome::Fail,
    }
}
