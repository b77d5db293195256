mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use stack_reconcile::{Config, Error as StackError, Orchestrator, Parser as ConfigParser};
use std::path::Path;

/// Exit code after Ctrl-C, as shells report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if let Some(stack_error) = e.downcast_ref::<StackError>() {
                eprintln!("Error: {}", stack_error);
                if let Some(suggestion) = stack_error.suggestion() {
                    eprintln!("\nHint: {}", suggestion);
                }
                if matches!(stack_error, StackError::Cancelled(_)) {
                    std::process::exit(EXIT_INTERRUPTED);
                }
            } else {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    // ── Commands that need no orchestrator ───────────────────────────
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(0);
        }
        Commands::Doctor => {
            // Doctor must work without a config file
            let config = load_config(cli.config.as_deref()).unwrap_or_else(|e| {
                tracing::debug!("Doctor running with defaults: {}", e);
                Config::default()
            });
            return commands::run_doctor(&config, output::select(false)).await;
        }
        _ => {}
    }

    // ── Load and validate config, build the orchestrator ─────────────
    let config = load_config(cli.config.as_deref())?;
    let mut builder = Orchestrator::builder()
        .config(config)
        .profile(cli.profile.clone());
    match &cli.command {
        Commands::Verify {
            timeout: Some(timeout),
            ..
        } => builder = builder.health_timeout(timeout.get()),
        Commands::Start {
            wait: Some(wait), ..
        } => builder = builder.start_wait(wait.get()),
        _ => {}
    }
    let orchestrator = builder.build()?;

    // Ctrl-C cancels the in-flight operation at its next boundary
    let token = orchestrator.cancellation_token();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let phase = cli.command.name();
    let command = async {
        match cli.command {
            Commands::Stop { json } => {
                commands::run_stop(&orchestrator, json, output::select(json)).await
            }
            Commands::Verify {
                include_optional,
                json,
                ..
            } => {
                commands::run_verify(&orchestrator, include_optional, json, output::select(json))
                    .await
            }
            Commands::Start {
                include_optional,
                json,
                ..
            } => {
                commands::run_start(&orchestrator, include_optional, json, output::select(json))
                    .await
            }
            Commands::Scan { json } => {
                commands::run_scan(&orchestrator, json, output::select(json)).await
            }
            Commands::Ports { json } => {
                commands::run_ports(&orchestrator, json, output::select(json)).await
            }
            Commands::Doctor | Commands::Completions { .. } => Ok(0),
        }
    };

    // Read-only commands have no cancellation points of their own
    tokio::select! {
        result = command => result,
        _ = token.cancelled() => Err(StackError::Cancelled(phase.to_string()).into()),
    }
}

/// `--config` if given, otherwise `stack.yaml` found from the current
/// directory upwards. Validation happens in the builder.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let parser = ConfigParser::new();
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => parser.find_config_file()?,
    };
    tracing::debug!("Using config {}", config_path.display());
    Ok(parser.load_config(&config_path)?)
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
