//! Session lifecycle manager.
//!
//! Owns the state machine of one (chat, date) session: idempotent creation,
//! signup acceptance, deadline enforcement and closing. Holds no session
//! state of its own -- every decision re-reads the store, which serializes
//! concurrent writers. Transient store contention is retried with bounded
//! linear backoff before an error is surfaced.

use std::sync::Arc;

use chrono::TimeDelta;
use coffeemate_types::chat::{ChatId, MessageRef};
use coffeemate_types::error::{RepositoryError, SessionError};
use coffeemate_types::session::{
    FinalizationResult, JoinOutcome, Member, MemberId, Participant, SessionDate, SessionId,
    resolve_display_name,
};
use rand::Rng;

use crate::clock::Clock;
use crate::grouping::partition;
use crate::repository::session::SessionStore;
use crate::retry::{BackoffPolicy, retry_busy};

/// Lifecycle operations for daily signup sessions.
///
/// Generic over the store and clock so tests can run against an in-memory
/// store and a manually advanced clock.
pub struct SessionLifecycle<S: SessionStore, C: Clock> {
    store: Arc<S>,
    clock: C,
    backoff: BackoffPolicy,
}

impl<S: SessionStore, C: Clock> SessionLifecycle<S, C> {
    pub fn new(store: Arc<S>, clock: C) -> Self {
        Self {
            store,
            clock,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Override the retry policy used for busy store errors.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The session date for the current instant.
    pub fn today(&self) -> SessionDate {
        SessionDate::of(self.clock.now())
    }

    /// Ensure a session exists for `(chat_id, date)` and return its id.
    ///
    /// Creates it with `deadline = now + window` when absent. When present,
    /// the deadline only ever moves forward. Concurrent callers for the same
    /// pair all receive the same id.
    pub async fn ensure_session_open(
        &self,
        chat_id: ChatId,
        date: SessionDate,
        window: TimeDelta,
    ) -> Result<SessionId, SessionError> {
        let deadline = self
            .clock
            .now()
            .checked_add_signed(window)
            .ok_or(SessionError::WindowOutOfRange(window))?;
        let store = &self.store;

        let id = retry_busy(&self.backoff, "create_or_get_session", move || {
            store.create_or_get_session(chat_id, date, deadline)
        })
        .await?;

        tracing::debug!(%chat_id, %date, session_id = %id, %deadline, "session ensured");
        Ok(id)
    }

    /// Attach the posted invite's handle to a session.
    ///
    /// Best-effort: a failure is logged and never propagated, since the
    /// invite has already been delivered.
    pub async fn record_invite_reference(&self, id: SessionId, invite_ref: MessageRef) {
        let store = &self.store;
        let result = retry_busy(&self.backoff, "set_invite_ref", move || {
            store.set_invite_ref(id, invite_ref)
        })
        .await;

        if let Err(e) = result {
            tracing::warn!(session_id = %id, %invite_ref, error = %e, "failed to record invite reference");
        }
    }

    /// True only if a session exists for the pair and its invite was posted.
    pub async fn has_open_invite_today(
        &self,
        chat_id: ChatId,
        date: SessionDate,
    ) -> Result<bool, SessionError> {
        let store = &self.store;
        let session = retry_busy(&self.backoff, "get_session_by_chat_date", move || {
            store.get_session_by_chat_date(chat_id, date)
        })
        .await?;

        Ok(session.is_some_and(|s| s.invite_ref.is_some()))
    }

    /// Whether a session would accept a signup right now.
    pub async fn accepts_signups(&self, id: SessionId) -> Result<bool, SessionError> {
        let store = &self.store;
        let session = retry_busy(&self.backoff, "get_session", move || store.get_session(id))
            .await?
            .ok_or(SessionError::NotFound(id))?;
        Ok(session.accepts_signups_at(self.clock.now()))
    }

    /// Attempt to sign `member_id` up for a session.
    pub async fn join(
        &self,
        id: SessionId,
        member_id: MemberId,
        handle: Option<&str>,
        name_parts: &[String],
    ) -> Result<JoinOutcome, SessionError> {
        let store = &self.store;
        let session = retry_busy(&self.backoff, "get_session", move || store.get_session(id))
            .await?
            .ok_or(SessionError::NotFound(id))?;

        let now = self.clock.now();
        if !session.accepts_signups_at(now) {
            tracing::debug!(session_id = %id, %member_id, closed = session.closed, deadline = %session.signup_deadline, "signup rejected: window closed");
            return Ok(JoinOutcome::WindowClosed);
        }

        let already = retry_busy(&self.backoff, "is_participant", move || {
            store.is_participant(id, member_id)
        })
        .await?;
        if already {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        let display_name = resolve_display_name(member_id, handle, name_parts);
        let name = display_name.as_str();

        // The insert re-checks openness atomically, so a close that lands
        // after the read above still wins. The (session, member) uniqueness
        // constraint settles concurrent joins.
        let outcome = retry_busy(&self.backoff, "add_participant", move || async move {
            match store.add_participant(id, member_id, handle, name, now).await {
                Ok(true) => Ok(JoinOutcome::Joined),
                Ok(false) => Ok(JoinOutcome::WindowClosed),
                Err(RepositoryError::Conflict(_)) => Ok(JoinOutcome::AlreadyJoined),
                Err(e) => Err(e),
            }
        })
        .await?;

        if outcome == JoinOutcome::Joined {
            tracing::info!(session_id = %id, %member_id, name = %display_name, "member joined");
        }
        Ok(outcome)
    }

    /// Close a session and compute its groups.
    ///
    /// Only the caller that actually flips the closed flag receives a
    /// publishable result; every later call gets
    /// [`FinalizationResult::AlreadyClosed`].
    pub async fn close_and_finalize<R: Rng + Send>(
        &self,
        id: SessionId,
        rng: &mut R,
    ) -> Result<FinalizationResult, SessionError> {
        let store = &self.store;
        let session = retry_busy(&self.backoff, "get_session", move || store.get_session(id))
            .await?
            .ok_or(SessionError::NotFound(id))?;
        if session.closed {
            return Ok(FinalizationResult::AlreadyClosed);
        }

        // Close first: no signup can land once the flag is set, so the
        // participant read below is the final list.
        let transitioned =
            retry_busy(&self.backoff, "close_session", move || store.close_session(id)).await?;
        if !transitioned {
            return Ok(FinalizationResult::AlreadyClosed);
        }

        let participants = retry_busy(&self.backoff, "get_participants", move || store.get_participants(id))
            .await
            .inspect_err(|e| tracing::error!(session_id = %id, error = %e, "session closed but participants unreadable"))?;

        let chat_id = session.chat_id;
        if participants.is_empty() {
            tracing::info!(session_id = %id, %chat_id, "session closed with no participants");
            return Ok(FinalizationResult::NoParticipants { chat_id });
        }

        let members: Vec<Member> = participants.iter().map(Participant::to_member).collect();
        let groups = partition(members.clone(), rng);
        tracing::info!(session_id = %id, %chat_id, participants = members.len(), groups = groups.len(), "session closed");

        Ok(FinalizationResult::Grouped {
            chat_id,
            members,
            groups,
        })
    }
}
