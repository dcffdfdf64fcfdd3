//! Status command.

use anyhow::Result;
use console::style;
use coffeemate_core::repository::session::SessionStore;
use coffeemate_types::schedule::DailyTime;

use crate::state::AppState;

/// Show the effective daily time, chat count and storage paths.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let raw_time = state.store.get_daily_time().await.ok();
    let daily_time = raw_time
        .as_deref()
        .map(DailyTime::parse_or_fallback)
        .unwrap_or(DailyTime::FALLBACK);
    // A stored value that does not parse is silently replaced by the fallback.
    let time_valid = raw_time
        .as_deref()
        .is_some_and(|raw| raw.parse::<DailyTime>().is_ok());
    let chats = state.store.count_chats().await?;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "daily_time": daily_time.to_string(),
            "stored_daily_time": raw_time,
            "chats": chats,
            "test_mode": state.config.test_mode,
            "signup_window_secs": state.config.signup_window_secs,
            "data_dir": state.data_dir.display().to_string(),
            "database": state.database_path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  {} coffeemate v{}", style("☕").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Schedule ──").dim());
    println!("  Daily time:    {} UTC", style(daily_time).cyan().bold());
    if !time_valid {
        println!(
            "  {}",
            style(format!(
                "Stored value {:?} is invalid; using fallback",
                raw_time.unwrap_or_default()
            ))
            .yellow()
        );
    }
    println!("  Signup window: {} min", state.config.signup_window_secs / 60);
    if state.config.test_mode {
        println!("  Mode:          {}", style("test").yellow());
    }
    println!();

    println!("  {}", style("── Chats ──").dim());
    println!("  Registered: {}", style(chats).bold());
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!("  Database: {}", style(state.database_path.display()).dim());
    println!();

    Ok(())
}
