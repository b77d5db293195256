mod doctor;
mod ports;
mod scan;
mod start;
mod stop;
mod verify;

pub use doctor::run_doctor;
pub use ports::run_ports;
pub use scan::run_scan;
pub use start::run_start;
pub use stop::run_stop;
pub use verify::run_verify;

use crate::output::UserOutput;
use stack_reconcile::orchestrator::ExternalAction;

/// Warn about failed runtime and control-plane calls.
fn report_external_failures(actions: &[ExternalAction], out: &dyn UserOutput) {
    for action in actions {
        if let Some(error) = &action.error {
            out.warning(&format!("  {} failed: {}", action.action, error));
        }
    }
}
