use crate::output::{print_json, UserOutput};
use stack_reconcile::Orchestrator;

pub async fn run_ports(
    orchestrator: &Orchestrator,
    json: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<i32> {
    let status = orchestrator.port_status().await;
    if json {
        print_json(&status)?;
        return Ok(0);
    }

    if status.is_empty() {
        out.warning("No services declared in the config.");
        return Ok(0);
    }

    out.status(&format!(
        "Reserved ports for profile '{}':",
        orchestrator.registry().profile()
    ));
    for check in &status {
        out.line(&check.line());
    }
    Ok(0)
}
