use crate::output::UserOutput;
use stack_reconcile::config::Config;
use stack_reconcile::process::ProcFsInspector;
use stack_reconcile::runtime::DockerClient;
use std::process::Stdio;

pub async fn run_doctor(config: &Config, out: &dyn UserOutput) -> anyhow::Result<i32> {
    out.status("Checking system requirements...\n");

    let mut all_ok = true;

    // Container runtime
    let runtime = DockerClient::from_config(&config.runtime);
    out.progress(&format!("{}: ", runtime.binary()));
    match runtime.version().await {
        Ok(version) => {
            out.finish_progress(&version);

            out.progress(&format!("{} daemon: ", runtime.binary()));
            if runtime.daemon_healthy().await {
                out.finish_progress("Running");
            } else {
                out.finish_progress(
                    "Not running (start Docker Desktop or run: sudo systemctl start docker)",
                );
                all_ok = false;
            }
        }
        Err(e) if e.is_not_installed() => {
            out.finish_progress("Not found");
            all_ok = false;
        }
        Err(e) => {
            out.finish_progress(&format!("Error: {}", e));
            all_ok = false;
        }
    }

    // Control plane, only when configured
    if let Some(cp) = &config.control_plane {
        out.progress(&format!("{}: ", cp.binary));
        match tokio::process::Command::new(&cp.binary)
            .args(["version", "--client"])
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                out.finish_progress(version.lines().next().unwrap_or("ok").trim());
            }
            _ => {
                out.finish_progress("Not found (control_plane is configured)");
                all_ok = false;
            }
        }
    }

    // Process table
    out.progress("Process table: ");
    let inspector = ProcFsInspector::new(config.orphans.markers.clone());
    match inspector.access_summary() {
        Ok((total, readable)) if readable == total => {
            out.finish_progress(&format!("{} processes, all readable", total));
        }
        Ok((total, readable)) => {
            out.finish_progress(&format!(
                "{} of {} processes readable (ports held by other users show as 'owner not visible')",
                readable, total
            ));
        }
        Err(e) => {
            out.finish_progress(&format!(
                "Cannot read {}: {}",
                inspector.root().display(),
                e
            ));
            all_ok = false;
        }
    }

    out.blank();
    if all_ok {
        out.success("All requirements met.");
        Ok(0)
    } else {
        out.error("Some requirements are missing.");
        Ok(1)
    }
}
