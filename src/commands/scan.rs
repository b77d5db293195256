use crate::output::{print_json, UserOutput};
use stack_reconcile::orphan::Classification;
use stack_reconcile::Orchestrator;

/// Exit 1 when some candidate could not be classified.
pub async fn run_scan(
    orchestrator: &Orchestrator,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<i32> {
    let candidates = orchestrator.plan_stop().await;
    let unknown = candidates
        .iter()
        .filter(|c| c.classification == Classification::Unknown)
        .count();
    let code = if unknown > 0 { 1 } else { 0 };

    if json {
        print_json(&candidates)?;
        return Ok(code);
    }

    if candidates.is_empty() {
        out.success("No process holds a reserved port or matches a signature.");
        return Ok(code);
    }

    for c in &candidates {
        let ports: Vec<String> = c.process.owning_ports.iter().map(u16::to_string).collect();
        let ports = if ports.is_empty() {
            "-".to_string()
        } else {
            ports.join(",")
        };
        out.report(&format!(
            "{:<17} pid {:<7} ports {:<11} {} ({})",
            c.classification, c.process.pid, ports, c.process.command_line, c.reason
        ));
    }

    let orphans = candidates
        .iter()
        .filter(|c| c.classification == Classification::Orphan)
        .count();
    out.blank();
    out.status(&format!(
        "`stop` would terminate {} process(es); {} left for manual review.",
        orphans, unknown
    ));
    Ok(code)
}
