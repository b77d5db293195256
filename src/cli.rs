use clap::{Parser, Subcommand};
use clap_complete::Shell;
use stack_reconcile::config::HumanDuration;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackctl")]
#[command(about = "Stop, reclaim and verify a local multi-service stack")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to stack.yaml in this or a parent directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Deployment profile used to resolve service ports
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Debug logging on stderr (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stop containers, terminate orphaned processes and confirm every
    /// reserved port is free
    Stop {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Probe every service by tier and report readiness
    Verify {
        /// Also probe OPTIONAL services (failures are reported as SKIP)
        #[arg(long)]
        include_optional: bool,

        /// Per-probe timeout, e.g. 2s or 500ms (defaults to health.timeout)
        #[arg(long, value_name = "DURATION")]
        timeout: Option<HumanDuration>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start containers and workloads, then wait until the stack verifies
    Start {
        /// Also probe OPTIONAL services
        #[arg(long)]
        include_optional: bool,

        /// How long to keep re-verifying (defaults to start.wait)
        #[arg(long, value_name = "DURATION")]
        wait: Option<HumanDuration>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what `stop` would terminate, without touching anything
    Scan {
        /// Print the candidates as JSON
        #[arg(long)]
        json: bool,
    },
    /// List reserved ports and their current owners
    Ports {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the tools this command relies on are available
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Stop { .. } => "stop",
            Commands::Verify { .. } => "verify",
            Commands::Start { .. } => "start",
            Commands::Scan { .. } => "scan",
            Commands::Ports { .. } => "ports",
            Commands::Doctor => "doctor",
            Commands::Completions { .. } => "completions",
        }
    }
}
