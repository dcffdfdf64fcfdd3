//! Recurring scheduler: the daily invite trigger and the session closer.
//!
//! Two independent loops share one cancellation token:
//! - **daily**: fires once per occurrence of the configured UTC time of day,
//!   re-reading the setting periodically so a changed time re-arms the timer
//!   without a restart. Occurrences missed while the process was down are
//!   not backfilled.
//! - **closer**: polls the store for open sessions past their deadline and
//!   hands them over in one batch per tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use coffeemate_types::schedule::DailyTime;
use coffeemate_types::session::SessionId;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::repository::session::SessionStore;

/// Callbacks invoked by the scheduler loops.
///
/// Decouples the scheduler from whatever performs invites and closing, so
/// tests can substitute a recorder.
pub trait ScheduleHooks: Send + Sync + 'static {
    /// The configured daily time has arrived.
    fn on_daily_invite(&self) -> impl Future<Output = ()> + Send;

    /// Open sessions whose deadline passed; never called with an empty batch.
    fn on_close_sessions(&self, ids: Vec<SessionId>) -> impl Future<Output = ()> + Send;
}

/// The next instant strictly after `from` at `time` (UTC).
pub fn next_occurrence(time: DailyTime, from: DateTime<Utc>) -> DateTime<Utc> {
    let time_of_day = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(NaiveTime::MIN);
    let candidate = from.date_naive().and_time(time_of_day).and_utc();
    if candidate > from {
        candidate
    } else {
        candidate + TimeDelta::days(1)
    }
}

/// The armed state of the daily loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTimer {
    time: DailyTime,
    next_fire: DateTime<Utc>,
}

impl DailyTimer {
    /// Arm for the next occurrence of `time` after `now`.
    pub fn arm(time: DailyTime, now: DateTime<Utc>) -> Self {
        Self {
            time,
            next_fire: next_occurrence(time, now),
        }
    }

    pub fn time(&self) -> DailyTime {
        self.time
    }

    pub fn next_fire(&self) -> DateTime<Utc> {
        self.next_fire
    }

    /// Wait until the armed instant, zero if it is already due.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.next_fire - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_fire
    }

    /// Apply a possibly changed time of day. Returns `true` if the armed
    /// instant moved.
    ///
    /// A fire that is already due is left alone so the check can never
    /// swallow it.
    pub fn reconfigure(&mut self, time: DailyTime, now: DateTime<Utc>) -> bool {
        if self.is_due(now) {
            return false;
        }
        let next_fire = next_occurrence(time, now);
        self.time = time;
        if next_fire == self.next_fire {
            return false;
        }
        self.next_fire = next_fire;
        true
    }
}

/// Timing knobs for the scheduler loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub close_interval: Duration,
    pub reconfigure_interval: Duration,
    /// Test mode runs only the closer.
    pub daily_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            close_interval: Duration::from_secs(30),
            reconfigure_interval: Duration::from_secs(60),
            daily_enabled: true,
        }
    }
}

/// Runs the daily and closer loops against a store and a set of hooks.
pub struct Scheduler<S: SessionStore, H: ScheduleHooks, C: Clock> {
    store: Arc<S>,
    hooks: Arc<H>,
    clock: C,
    config: SchedulerConfig,
}

/// Join handles of the spawned loops.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Wait for every loop to observe cancellation and exit.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "scheduler loop panicked");
            }
        }
    }
}

impl<S, H, C> Scheduler<S, H, C>
where
    S: SessionStore + 'static,
    H: ScheduleHooks,
    C: Clock + Clone,
{
    pub fn new(store: Arc<S>, hooks: Arc<H>, clock: C, config: SchedulerConfig) -> Self {
        Self {
            store,
            hooks,
            clock,
            config,
        }
    }

    /// Spawn both loops. They stop once `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> SchedulerHandle {
        let mut tasks = Vec::with_capacity(2);

        if self.config.daily_enabled {
            let this = self.clone();
            let token = cancel.clone();
            tasks.push(tokio::spawn(async move { this.run_daily(token).await }));
        } else {
            tracing::info!("daily loop disabled");
        }

        let this = self;
        tasks.push(tokio::spawn(async move { this.run_closer(cancel).await }));

        SchedulerHandle { tasks }
    }

    async fn read_daily_time(&self) -> Option<DailyTime> {
        match self.store.get_daily_time().await {
            Ok(raw) => Some(DailyTime::parse_or_fallback(&raw)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read daily time");
                None
            }
        }
    }

    /// Daily loop: `Idle(next fire) -> Firing -> Idle(new next fire)`,
    /// `Stopped` on cancellation.
    pub async fn run_daily(&self, cancel: CancellationToken) {
        let time = self.read_daily_time().await.unwrap_or(DailyTime::FALLBACK);
        let mut timer = DailyTimer::arm(time, self.clock.now());
        tracing::info!(daily_time = %timer.time(), next_fire = %timer.next_fire(), "daily loop armed");

        let period = self.config.reconfigure_interval;
        let mut reconfigure = interval_at(Instant::now() + period, period);
        reconfigure.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wait = timer.remaining(self.clock.now());
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("daily loop stopped");
                    return;
                }
                _ = tokio::time::sleep(wait) => {
                    // The sleep is monotonic; a wall clock stepped back wakes us early.
                    if !timer.is_due(self.clock.now()) {
                        tracing::debug!(next_fire = %timer.next_fire(), "woke before daily fire, waiting again");
                        continue;
                    }
                    tracing::info!(fire_at = %timer.next_fire(), "daily trigger firing");
                    self.hooks.on_daily_invite().await;

                    let time = self.read_daily_time().await.unwrap_or(timer.time());
                    timer = DailyTimer::arm(time, self.clock.now());
                    tracing::info!(next_fire = %timer.next_fire(), "daily loop re-armed");
                }
                _ = reconfigure.tick() => {
                    // On a read failure keep the current arming.
                    let Some(time) = self.read_daily_time().await else { continue };
                    if timer.reconfigure(time, self.clock.now()) {
                        tracing::info!(daily_time = %time, next_fire = %timer.next_fire(), "daily time changed, timer reset");
                    }
                }
            }
        }
    }

    /// Closer loop: one store poll and at most one hook call per tick.
    pub async fn run_closer(&self, cancel: CancellationToken) {
        let period = self.config.close_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval = ?period, "closer loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("closer loop stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    match self.store.open_sessions_past_deadline(now).await {
                        Ok(ids) if ids.is_empty() => {
                            tracing::trace!("closer tick: nothing to close");
                        }
                        Ok(ids) => {
                            tracing::info!(count = ids.len(), "closing sessions past deadline");
                            self.hooks.on_close_sessions(ids).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "closer query failed");
                        }
                    }
                }
            }
        }
    }
}
