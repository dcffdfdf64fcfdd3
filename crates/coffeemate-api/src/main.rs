//! coffeemate CLI and daemon entry point.
//!
//! Parses CLI arguments, initializes logging and storage, then dispatches to
//! the command handler.

mod cli;
mod state;

use clap::Parser;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = coffeemate_observe::tracing_setup::filter_for_verbosity(cli.verbose, cli.quiet);
    if let Err(e) = coffeemate_observe::tracing_setup::init_tracing(filter, cli.log_json) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let force_test_mode = matches!(cli.command, Commands::Run { test: true });
    let state = AppState::init(cli.config.as_deref(), force_test_mode).await?;

    match cli.command {
        Commands::Run { .. } => {
            cli::run::run(&state, shutdown_signal()).await?;
            // The stdin reader thread may still be blocked in read; don't wait for it.
            std::process::exit(0);
        }

        Commands::InviteOnce => {
            cli::schedule::invite_once(&state).await?;
        }

        Commands::SetTime { time } => {
            cli::schedule::set_time(&state, &time).await?;
        }

        Commands::Status { json } => {
            cli::status::status(&state, json).await?;
        }
    }

    state.db_pool.close().await;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
