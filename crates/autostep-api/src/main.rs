//! Autostep CLI entry point.
//!
//! Binary name: `autostep`
//!
//! Parses CLI arguments, resolves the data root, sets up logging, then
//! dispatches to the command handler.

mod cli;
mod state;

use anyhow::Context;
use autostep_infra::config::load_config;
use autostep_infra::paths::AutostepPaths;
use autostep_infra::state::StoreLock;
use autostep_observe::tracing_setup::{LogSettings, init_tracing, shutdown_tracing};
use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Neither needs the data root.
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "autostep", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Version => return cli::print_version(cli.json),
        _ => {}
    }

    let paths = AutostepPaths::resolve(cli.root.as_deref());
    paths
        .ensure()
        .with_context(|| format!("create data root {}", paths.root.display()))?;
    let config = load_config(&paths.config_file).await;

    let settings = LogSettings::from_verbosity(cli.verbose, cli.quiet, &config.log.level)
        .with_log_file(&paths.log_file)
        .with_otel(config.log.otel);
    if let Err(e) = init_tracing(&settings) {
        eprintln!("Warning: logging setup failed: {e}");
    }

    let result = dispatch(cli, paths, config).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "command failed");
    }
    shutdown_tracing();
    result
}

async fn dispatch(
    cli: Cli,
    paths: AutostepPaths,
    config: autostep_types::config::AutostepConfig,
) -> anyhow::Result<()> {
    // Held until dispatch returns; the OS releases it if the process dies.
    let _lock = if cli.command.needs_store_lock() {
        Some(StoreLock::acquire(&paths.lock_file).context("another autostep process is using the run store")?)
    } else {
        None
    };

    let state = AppState::init(paths, config).await?;

    let cancel = state.cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::warn!("shutdown signal received");
        cancel.cancel();
    });

    match cli.command {
        Commands::Run { workflow } => cli::run::run_workflow(&state, &workflow, cli.json).await,
        Commands::List => cli::list::list_workflows(&state, cli.json),
        Commands::Status => cli::status::show_status(&state, cli.json).await,
        Commands::ResumePending => cli::resume::resume_pending_cmd(&state, cli.json).await,
        Commands::Serve => cli::serve::serve(&state, cli.quiet).await,
        Commands::ConfigureSafebootService => {
            cli::safeboot::configure_safeboot_service(&state, cli.json).await
        }
        Commands::Completions { .. } | Commands::Version => Ok(()),
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
