//! Session store trait definition.

use chrono::{DateTime, Utc};
use coffeemate_types::chat::{Chat, ChatId, MessageRef};
use coffeemate_types::error::RepositoryError;
use coffeemate_types::schedule::DailyTime;
use coffeemate_types::session::{MemberId, Participant, Session, SessionDate, SessionId};

/// Durable keyed storage for chats, sessions, participants and settings.
///
/// The store is the single source of truth and the serialization point for
/// concurrent writers; nothing above it caches session state. Implementations
/// must report lock/busy contention as [`RepositoryError::Busy`] so callers
/// can retry, and absent rows as [`RepositoryError::NotFound`] (or `None`).
///
/// Implementations live in coffeemate-infra (e.g., SqliteSessionStore).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait SessionStore: Send + Sync {
    /// Insert a chat or refresh its title.
    fn upsert_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All known chat ids, in registration order.
    fn list_chat_ids(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ChatId>, RepositoryError>> + Send;

    fn count_chats(&self) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Create the session for `(chat_id, date)` or return the existing one.
    ///
    /// A uniqueness violation on the pair is a lost creation race, not an
    /// error: the winner's id is returned. When the session already exists
    /// and is still open, its deadline moves to `deadline` only if that is
    /// later than the stored one.
    fn create_or_get_session(
        &self,
        chat_id: ChatId,
        date: SessionDate,
        deadline: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<SessionId, RepositoryError>> + Send;

    fn set_invite_ref(
        &self,
        id: SessionId,
        invite_ref: MessageRef,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_session_by_chat_date(
        &self,
        chat_id: ChatId,
        date: SessionDate,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    fn get_session(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// `(chat, date)` of a session; [`RepositoryError::NotFound`] if absent.
    fn get_session_info(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<(ChatId, SessionDate), RepositoryError>> + Send;

    /// Record a signup, atomically with the openness check: returns `false`
    /// without inserting when the session is closed, missing, or its
    /// deadline is before `joined_at`. Fails with
    /// [`RepositoryError::Conflict`] if the member already joined.
    fn add_participant(
        &self,
        id: SessionId,
        member_id: MemberId,
        handle: Option<&str>,
        display_name: &str,
        joined_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    fn is_participant(
        &self,
        id: SessionId,
        member_id: MemberId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Participants of a session in join order.
    fn get_participants(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<Participant>, RepositoryError>> + Send;

    /// Ids of sessions not yet closed whose deadline is at or before `now`.
    fn open_sessions_past_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<SessionId>, RepositoryError>> + Send;

    /// Mark a session closed. Returns `true` only for the call that performed
    /// the transition; closing a closed session is a no-op returning `false`.
    fn close_session(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// The raw stored daily time ("HH:MM"). Parsing is left to the caller
    /// so a corrupted value degrades instead of failing.
    fn get_daily_time(
        &self,
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;

    fn set_daily_time(
        &self,
        time: DailyTime,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Seed the settings row if it does not exist yet. Never overwrites.
    fn ensure_default_settings(
        &self,
        default_time: DailyTime,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
