#![allow(unused_assignments)]

//! # Stack Reconcile
//!
//! Point-in-time reconciliation and health verification for a local
//! multi-service stack.
//!
//! ## Features
//!
//! - **Port Registry**: service name to reserved port and tier, per deployment profile
//! - **Process Inspection**: owners of reserved ports and signature matches read from `/proc`
//! - **Conservative Orphan Classification**: container-managed, orphan or unknown; only orphans are killed
//! - **Escalating Termination**: SIGTERM, bounded grace, one SIGKILL, then a mandatory port re-scan
//! - **Tiered Health Verification**: INFRA, REQUIRED and OPTIONAL probes with per-probe timeouts
//! - **Cancellation Support**: in-progress operations stop via `CancellationToken`
//!
//! ## Quick Start
//!
//! ```no_run
//! use stack_reconcile::{Orchestrator, Parser};
//!
//! # async fn example() -> Result<(), stack_reconcile::Error> {
//! let parser = Parser::new();
//! let config = parser.load_config("stack.yaml")?;
//!
//! let orchestrator = Orchestrator::builder().config(config).build()?;
//!
//! // Stop containers, reclaim ports from orphans, confirm ports are free
//! let stop = orchestrator.stop_all().await?;
//! for line in stop.lines() {
//!     println!("{}", line);
//! }
//!
//! // Probe INFRA and REQUIRED tiers
//! let health = orchestrator.verify_all(false).await;
//! println!("{}", health.summary());
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod healthcheck;
pub mod orchestrator;
pub mod orphan;
pub mod port;
pub mod process;
pub mod report;
pub mod runtime;

// Re-export commonly used types
pub use config::{Config, Parser, Tier};
pub use error::{Error, Result};
pub use healthcheck::{HealthReport, HealthTarget};
pub use orchestrator::{Orchestrator, StartReport, StopReport};
pub use port::{PortRegistry, ServicePort};
