//! Coordinator: ties session lifecycle to chat messages.
//!
//! Handles inbound events (chat added, member pressed join), posts the daily
//! invitations and publishes group announcements when the closer hands over
//! expired sessions. Implements [`ScheduleHooks`] so the scheduler can drive it.

use std::sync::Arc;
use std::time::Instant;

use chrono::TimeDelta;
use coffeemate_types::chat::{Chat, ChatId};
use coffeemate_types::config::AppConfig;
use coffeemate_types::error::SessionError;
use coffeemate_types::event::InboundEvent;
use coffeemate_types::session::{
    ActionToken, FinalizationResult, Group, JoinOutcome, Member, MemberId, SessionId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::grouping::partition;
use crate::lifecycle::SessionLifecycle;
use crate::messages;
use crate::notify::Notifier;
use crate::repository::session::SessionStore;
use crate::scheduler::ScheduleHooks;

/// Member ids of the in-memory test-mode placeholders.
const PLACEHOLDER_BASE_ID: i64 = 900_001;

/// Settings the coordinator needs from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub signup_window: TimeDelta,
    pub test_mode: bool,
}

impl From<&AppConfig> for CoordinatorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            signup_window: config.signup_window(),
            test_mode: config.test_mode,
        }
    }
}

/// Totals of one invite round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InviteSummary {
    pub chats: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Coordinator<S: SessionStore, N: Notifier, C: Clock> {
    lifecycle: SessionLifecycle<S, C>,
    notifier: Arc<N>,
    config: CoordinatorConfig,
    rng: Mutex<StdRng>,
}

impl<S: SessionStore, N: Notifier, C: Clock> Coordinator<S, N, C> {
    pub fn new(lifecycle: SessionLifecycle<S, C>, notifier: Arc<N>, config: CoordinatorConfig) -> Self {
        Self {
            lifecycle,
            notifier,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a fixed seed for group shuffling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn lifecycle(&self) -> &SessionLifecycle<S, C> {
        &self.lifecycle
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    /// Dispatch one inbound event.
    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::ChatAdded { chat_id, title } => self.on_chat_added(chat_id, title).await,
            InboundEvent::ActionInvoked {
                token,
                member_id,
                handle,
                name_parts,
                ack_id,
            } => {
                self.on_action(&token, member_id, handle.as_deref(), &name_parts, &ack_id)
                    .await
            }
        }
    }

    /// Consume events until the channel closes or `cancel` fires.
    pub async fn run_event_loop(&self, mut events: mpsc::Receiver<InboundEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("event loop stopped");
                    return;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        tracing::info!("event feed closed");
                        return;
                    }
                },
            }
        }
    }

    /// Register a chat and introduce the bot there.
    pub async fn on_chat_added(&self, chat_id: ChatId, title: String) {
        let chat = Chat { id: chat_id, title };
        if let Err(e) = self.lifecycle.store().upsert_chat(&chat).await {
            tracing::error!(%chat_id, error = %e, "failed to register chat");
            return;
        }
        tracing::info!(%chat_id, title = %chat.title, "chat registered");

        if let Err(e) = self.notifier.post_text(chat_id, messages::INTRO).await {
            tracing::warn!(%chat_id, error = %e, "failed to post intro");
        }

        if self.config.test_mode {
            self.invite_chat(chat_id).await;
        }
    }

    /// Post today's invite to every known chat.
    pub async fn send_daily_invites(&self) -> InviteSummary {
        let started = Instant::now();
        let chat_ids = match self.lifecycle.store().list_chat_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "failed to list chats, no invites sent");
                return InviteSummary::default();
            }
        };

        let mut summary = InviteSummary {
            chats: chat_ids.len(),
            ..InviteSummary::default()
        };
        for chat_id in chat_ids {
            match self.try_invite_chat(chat_id).await {
                Ok(true) => summary.sent += 1,
                Ok(false) => summary.skipped += 1,
                Err(()) => summary.failed += 1,
            }
        }

        tracing::info!(
            chats = summary.chats,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "daily invites done"
        );
        summary
    }

    /// Post today's invite to one chat. Returns true only if a new invite
    /// was posted.
    pub async fn invite_chat(&self, chat_id: ChatId) -> bool {
        self.try_invite_chat(chat_id).await.unwrap_or(false)
    }

    async fn try_invite_chat(&self, chat_id: ChatId) -> Result<bool, ()> {
        let date = self.lifecycle.today();
        match self.lifecycle.has_open_invite_today(chat_id, date).await {
            Ok(true) => {
                tracing::debug!(%chat_id, %date, "invite already posted today");
                return Ok(false);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(%chat_id, error = %e, "failed to check today's invite");
                return Err(());
            }
        }

        let session_id = self
            .lifecycle
            .ensure_session_open(chat_id, date, self.config.signup_window)
            .await
            .map_err(|e| tracing::error!(%chat_id, error = %e, "failed to open session"))?;

        // Today's session may already be closed, e.g. swept after a failed post.
        let open = self
            .lifecycle
            .accepts_signups(session_id)
            .await
            .map_err(|e| tracing::error!(%chat_id, %session_id, error = %e, "failed to read session"))?;
        if !open {
            tracing::info!(%chat_id, %session_id, "today's session no longer accepts signups, not inviting");
            return Ok(false);
        }

        let invite_ref = self
            .notifier
            .post_invite(chat_id, messages::DAILY_INVITE, ActionToken::Join(session_id))
            .await
            .map_err(|e| tracing::warn!(%chat_id, %session_id, error = %e, "failed to post invite"))?;

        self.lifecycle.record_invite_reference(session_id, invite_ref).await;
        tracing::info!(%chat_id, %session_id, %invite_ref, "invite posted");
        Ok(true)
    }

    /// Handle a press of an invite's control.
    pub async fn on_action(
        &self,
        token: &str,
        member_id: MemberId,
        handle: Option<&str>,
        name_parts: &[String],
        ack_id: &str,
    ) {
        let reply = match token.parse::<ActionToken>() {
            Ok(ActionToken::Join(session_id)) => {
                match self.lifecycle.join(session_id, member_id, handle, name_parts).await {
                    Ok(JoinOutcome::Joined) => messages::JOINED_ACK,
                    Ok(JoinOutcome::AlreadyJoined) => messages::ALREADY_JOINED_ACK,
                    Ok(JoinOutcome::WindowClosed) => messages::SIGNUP_CLOSED_ACK,
                    Err(SessionError::NotFound(_)) => {
                        tracing::warn!(%session_id, %member_id, "join for unknown session");
                        messages::UNKNOWN_ACTION_ACK
                    }
                    Err(e) => {
                        tracing::error!(%session_id, %member_id, error = %e, "join failed");
                        messages::TRY_AGAIN_ACK
                    }
                }
            }
            Err(e) => {
                tracing::warn!(token, %member_id, error = %e, "unrecognized action token");
                messages::UNKNOWN_ACTION_ACK
            }
        };

        if let Err(e) = self.notifier.acknowledge(ack_id, reply).await {
            tracing::warn!(ack_id, error = %e, "failed to acknowledge action");
        }
    }

    /// Close and publish each session independently.
    pub async fn close_sessions(&self, ids: Vec<SessionId>) {
        for id in ids {
            self.close_and_publish(id).await;
        }
    }

    async fn close_and_publish(&self, id: SessionId) {
        let mut rng = self.rng.lock().await;
        let result = match self.lifecycle.close_and_finalize(id, &mut *rng).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(session_id = %id, error = %e, "failed to close session");
                return;
            }
        };

        let (chat_id, text) = match result {
            FinalizationResult::AlreadyClosed => {
                tracing::debug!(session_id = %id, "session already closed");
                return;
            }
            FinalizationResult::NoParticipants { chat_id } => (chat_id, messages::NO_PARTICIPANTS.to_string()),
            FinalizationResult::Grouped {
                chat_id,
                members,
                groups,
            } => {
                let groups = if self.config.test_mode && members.len() == 1 {
                    tracing::info!(session_id = %id, "test mode: padding single signup with placeholders");
                    partition(with_placeholders(members), &mut *rng)
                } else {
                    groups
                };
                tracing::info!(%chat_id, session_id = %id, sizes = ?group_sizes(&groups), "publishing groups");
                (chat_id, messages::format_groups(&groups))
            }
        };
        drop(rng);

        if let Err(e) = self.notifier.post_text(chat_id, &text).await {
            tracing::warn!(%chat_id, session_id = %id, error = %e, "failed to publish result");
        }
    }
}

fn with_placeholders(mut members: Vec<Member>) -> Vec<Member> {
    members.extend(messages::PLACEHOLDER_NAMES.iter().enumerate().map(|(i, name)| Member {
        id: MemberId(PLACEHOLDER_BASE_ID + i as i64),
        name: (*name).to_string(),
    }));
    members
}

impl<S, N, C> ScheduleHooks for Coordinator<S, N, C>
where
    S: SessionStore + 'static,
    N: Notifier + 'static,
    C: Clock,
{
    async fn on_daily_invite(&self) {
        self.send_daily_invites().await;
    }

    async fn on_close_sessions(&self, ids: Vec<SessionId>) {
        self.close_sessions(ids).await;
    }
}

/// Group sizes as a compact list, for log fields.
pub fn group_sizes(groups: &[Group]) -> Vec<usize> {
    groups.iter().map(Group::len).collect()
}
