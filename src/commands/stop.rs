use super::report_external_failures;
use crate::output::{print_json, UserOutput};
use stack_reconcile::Orchestrator;

pub async fn run_stop(
    orchestrator: &Orchestrator,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<i32> {
    out.status(&format!(
        "Stopping stack (profile '{}')...",
        orchestrator.registry().profile()
    ));

    let report = orchestrator.stop_all().await?;

    if json {
        print_json(&report)?;
        return Ok(report.exit_code());
    }

    report_external_failures(&report.external, out);

    if report.already_clean() {
        out.success("Stack already stopped; nothing to terminate.");
    } else if !report.termination.killed.is_empty() {
        let pids: Vec<String> = report
            .termination
            .killed
            .iter()
            .map(u32::to_string)
            .collect();
        out.status(&format!(
            "Terminated {} orphan process(es): {}",
            pids.len(),
            pids.join(", ")
        ));
    }

    let unknown = report.unknown().count();
    if unknown > 0 {
        out.warning(&format!(
            "{} process(es) left alone because their ownership is unclear; check the WARN lines below.",
            unknown
        ));
    }

    for line in report.lines() {
        out.line(&line);
    }
    out.report(&report.summary());

    if !report.is_success() {
        out.error("Reserved ports are still occupied; stop the listed PIDs manually and re-run.");
    }
    Ok(report.exit_code())
}
