use crate::config::Tier;
use crate::report::{summary_line, LineStatus, ReportLine};
use serde::Serialize;

/// Terminal state of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
}

impl From<Outcome> for LineStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => LineStatus::Pass,
            Outcome::Fail => LineStatus::Fail,
            Outcome::Skip => LineStatus::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub label: String,
    pub tier: Tier,
    pub outcome: Outcome,
    pub detail: String,
}

impl HealthCheckResult {
    pub fn line(&self) -> ReportLine {
        ReportLine::new(
            self.outcome.into(),
            Some(self.tier),
            self.label.clone(),
            self.detail.clone(),
        )
    }
}

/// Results in tier order, then declaration order within a tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub results: Vec<HealthCheckResult>,
    pub pass_count: usize,
    pub fail_count: usize,
    pub skip_count: usize,
}

impl HealthReport {
    pub fn from_results(results: Vec<HealthCheckResult>) -> Self {
        let count = |o: Outcome| results.iter().filter(|r| r.outcome == o).count();
        let (pass_count, fail_count, skip_count) =
            (count(Outcome::Pass), count(Outcome::Fail), count(Outcome::Skip));
        Self {
            results,
            pass_count,
            fail_count,
            skip_count,
        }
    }

    /// No INFRA or REQUIRED probe failed.
    pub fn is_success(&self) -> bool {
        !self
            .results
            .iter()
            .any(|r| r.outcome == Outcome::Fail && r.tier.is_critical())
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &HealthCheckResult> {
        self.results.iter().filter(|r| r.outcome == Outcome::Fail)
    }

    pub fn lines(&self) -> Vec<ReportLine> {
        self.results.iter().map(HealthCheckResult::line).collect()
    }

    pub fn summary(&self) -> String {
        summary_line(self.pass_count, self.fail_count)
    }
}
