//! Plain-text report lines shared by `stop` and `verify`.
//!
//! ```text
//! PASS [INFRA] cache (127.0.0.1:6379: connected)
//! FAIL [REQUIRED] api (http://127.0.0.1:8091/health: HTTP 503)
//! Result: 1 passed, 1 failed
//! ```

use crate::config::Tier;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineStatus {
    Pass,
    Fail,
    Skip,
    Warn,
}

impl LineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LineStatus::Pass => "PASS",
            LineStatus::Fail => "FAIL",
            LineStatus::Skip => "SKIP",
            LineStatus::Warn => "WARN",
        }
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub status: LineStatus,
    pub tier: Option<Tier>,
    pub label: String,
    pub detail: String,
}

impl ReportLine {
    pub fn new(
        status: LineStatus,
        tier: Option<Tier>,
        label: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            tier,
            label: label.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tier {
            Some(tier) => write!(
                f,
                "{} [{}] {} ({})",
                self.status, tier, self.label, self.detail
            ),
            None => write!(f, "{} {} ({})", self.status, self.label, self.detail),
        }
    }
}

pub fn summary_line(passed: usize, failed: usize) -> String {
    format!("Result: {} passed, {} failed", passed, failed)
}
