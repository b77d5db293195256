use super::report_external_failures;
use super::verify::print_health;
use crate::output::{print_json, UserOutput};
use stack_reconcile::Orchestrator;

pub async fn run_start(
    orchestrator: &Orchestrator,
    include_optional: bool,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<i32> {
    out.status("Starting containers and workloads...");

    let report = orchestrator.start_and_verify(include_optional).await?;
    if json {
        print_json(&report)?;
        return Ok(report.exit_code());
    }

    report_external_failures(&report.external, out);
    if report.attempts > 1 {
        out.status(&format!("Verified after {} attempt(s)", report.attempts));
    }
    print_health(&report.health, out);
    Ok(report.exit_code())
}
