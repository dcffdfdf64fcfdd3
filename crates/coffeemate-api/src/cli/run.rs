//! `coffeemate run`: the long-running daemon.

use std::sync::Arc;

use anyhow::Result;
use coffeemate_core::repository::session::SessionStore;
use coffeemate_infra::bridge::read_events;
use coffeemate_types::schedule::DailyTime;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Capacity of the inbound event channel.
const EVENT_BUFFER: usize = 256;

/// Run the event consumer, daily loop and closer loop until `shutdown`
/// resolves.
pub async fn run(state: &AppState, shutdown: impl Future<Output = ()>) -> Result<()> {
    let coordinator = Arc::new(state.coordinator());
    let scheduler = Arc::new(state.scheduler(coordinator.clone()));

    let chats = state.store.count_chats().await?;
    let daily_time = match state.store.get_daily_time().await {
        Ok(raw) => DailyTime::parse_or_fallback(&raw),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read daily time");
            DailyTime::FALLBACK
        }
    };
    tracing::info!(
        chats,
        %daily_time,
        test_mode = state.config.test_mode,
        database = %state.database_path.display(),
        "coffeemate starting"
    );

    let cancel = CancellationToken::new();

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    // Not joined on shutdown: a pending stdin read cannot be interrupted.
    tokio::spawn(read_events(BufReader::new(tokio::io::stdin()), tx, cancel.clone()));

    let events = {
        let coordinator = coordinator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run_event_loop(rx, cancel).await })
    };

    let loops = scheduler.spawn(cancel.clone());

    if state.config.test_mode {
        tracing::info!("test mode: sending invites now");
        coordinator.send_daily_invites().await;
    }

    shutdown.await;
    tracing::info!("shutdown requested");
    cancel.cancel();

    loops.join().await;
    if let Err(e) = events.await {
        tracing::error!(error = %e, "event loop panicked");
    }
    state.db_pool.close().await;

    tracing::info!("coffeemate stopped");
    Ok(())
}
