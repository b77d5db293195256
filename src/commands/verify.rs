use crate::output::{print_json, UserOutput};
use stack_reconcile::healthcheck::HealthReport;
use stack_reconcile::Orchestrator;

pub async fn run_verify(
    orchestrator: &Orchestrator,
    include_optional: bool,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<i32> {
    out.status(&format!(
        "Verifying {} service(s)...",
        orchestrator.health_targets().len()
    ));

    let report = orchestrator.verify_all(include_optional).await;
    if json {
        print_json(&report)?;
    } else {
        print_health(&report, out);
    }
    Ok(report.exit_code())
}

pub(super) fn print_health(report: &HealthReport, out: &dyn UserOutput) {
    for line in report.lines() {
        out.line(&line);
    }
    out.report(&report.summary());

    if report.is_success() {
        out.success("Stack is ready.");
    } else {
        let failed: Vec<&str> = report.failures().map(|r| r.label.as_str()).collect();
        out.error(&format!("Stack not ready: {} failed.", failed.join(", ")));
    }
}
