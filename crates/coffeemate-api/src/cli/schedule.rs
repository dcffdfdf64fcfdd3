//! One-shot scheduling commands: `set-time` and `invite-once`.

use anyhow::{Context, Result};
use console::style;
use coffeemate_core::repository::session::SessionStore;
use coffeemate_types::schedule::DailyTime;

use crate::state::AppState;

/// Validate and store the daily invite time.
///
/// A running daemon picks the new time up on its next reconfigure check.
pub async fn set_time(state: &AppState, raw: &str) -> Result<()> {
    let time: DailyTime = raw.parse().with_context(|| format!("cannot set daily time to '{raw}'"))?;
    state.store.set_daily_time(time).await?;

    tracing::info!(daily_time = %time, "daily time updated");
    println!(
        "  {} Daily invite time set to {} UTC",
        style("✓").green(),
        style(time).cyan().bold()
    );
    Ok(())
}

/// Post today's invites to every known chat, then exit.
///
/// Invites go to stdout as bridge messages, so the summary is written to
/// stderr.
pub async fn invite_once(state: &AppState) -> Result<()> {
    let coordinator = state.coordinator();
    let summary = coordinator.send_daily_invites().await;

    eprintln!(
        "  {} Invites: {} sent, {} skipped, {} failed ({} chats)",
        style("✓").green(),
        style(summary.sent).bold(),
        summary.skipped,
        summary.failed,
        summary.chats
    );
    Ok(())
}
