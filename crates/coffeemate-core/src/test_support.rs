//! In-memory doubles shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use coffeemate_types::chat::{Chat, ChatId, MessageRef};
use coffeemate_types::error::{NotifyError, RepositoryError};
use coffeemate_types::schedule::DailyTime;
use coffeemate_types::session::{ActionToken, MemberId, Participant, Session, SessionDate, SessionId};

use crate::clock::Clock;
use crate::notify::Notifier;
use crate::repository::session::SessionStore;

#[derive(Default)]
struct MemoryInner {
    chats: Vec<Chat>,
    sessions: Vec<Session>,
    participants: Vec<Participant>,
    daily_time: Option<String>,
}

/// Mutex-guarded store with the same contracts as the SQLite one.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    /// Number of upcoming `create_or_get_session` calls that report Busy.
    pub busy_creates: AtomicU32,
    /// Close the target session right before the next `add_participant`
    /// applies, as a closer running between a join's read and its insert.
    pub close_before_insert: AtomicBool,
    /// Every `get_session` reports Busy.
    pub busy_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn participant_count(&self, id: SessionId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .participants
            .iter()
            .filter(|p| p.session_id == id)
            .count()
    }

    pub fn set_deadline(&self, id: SessionId, deadline: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(s) = inner.sessions.iter_mut().find(|s| s.id == id) {
            s.signup_deadline = deadline;
        }
    }

    pub fn set_raw_daily_time(&self, raw: &str) {
        self.inner.lock().unwrap().daily_time = Some(raw.to_string());
    }
}

impl SessionStore for MemoryStore {
    async fn upsert_chat(&self, chat: &Chat) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => existing.title = chat.title.clone(),
            None => inner.chats.push(chat.clone()),
        }
        Ok(())
    }

    async fn list_chat_ids(&self) -> Result<Vec<ChatId>, RepositoryError> {
        Ok(self.inner.lock().unwrap().chats.iter().map(|c| c.id).collect())
    }

    async fn count_chats(&self) -> Result<u64, RepositoryError> {
        Ok(self.inner.lock().unwrap().chats.len() as u64)
    }

    async fn create_or_get_session(
        &self,
        chat_id: ChatId,
        date: SessionDate,
        deadline: DateTime<Utc>,
    ) -> Result<SessionId, RepositoryError> {
        let pending = self.busy_creates.load(Ordering::SeqCst);
        if pending > 0 {
            self.busy_creates.store(pending - 1, Ordering::SeqCst);
            return Err(RepositoryError::Busy("database is locked".to_string()));
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .sessions
            .iter_mut()
            .find(|s| s.chat_id == chat_id && s.date == date)
        {
            if !existing.closed && deadline > existing.signup_deadline {
                existing.signup_deadline = deadline;
            }
            return Ok(existing.id);
        }

        let id = SessionId(inner.sessions.len() as i64 + 1);
        inner.sessions.push(Session {
            id,
            chat_id,
            date,
            signup_deadline: deadline,
            invite_ref: None,
            closed: false,
        });
        Ok(id)
    }

    async fn set_invite_ref(&self, id: SessionId, invite_ref: MessageRef) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RepositoryError::NotFound)?;
        session.invite_ref = Some(invite_ref);
        Ok(())
    }

    async fn get_session_by_chat_date(
        &self,
        chat_id: ChatId,
        date: SessionDate,
    ) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.chat_id == chat_id && s.date == date)
            .cloned())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        if self.busy_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Busy("database is locked".to_string()));
        }
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn get_session_info(&self, id: SessionId) -> Result<(ChatId, SessionDate), RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| (s.chat_id, s.date))
            .ok_or(RepositoryError::NotFound)
    }

    async fn add_participant(
        &self,
        id: SessionId,
        member_id: MemberId,
        handle: Option<&str>,
        display_name: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if self.close_before_insert.swap(false, Ordering::SeqCst) {
            if let Some(s) = inner.sessions.iter_mut().find(|s| s.id == id) {
                s.closed = true;
            }
        }
        let open = inner
            .sessions
            .iter()
            .any(|s| s.id == id && !s.closed && s.signup_deadline >= joined_at);
        if !open {
            return Ok(false);
        }
        if inner
            .participants
            .iter()
            .any(|p| p.session_id == id && p.member_id == member_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "member {member_id} already joined session {id}"
            )));
        }
        inner.participants.push(Participant {
            session_id: id,
            member_id,
            handle: handle.map(str::to_string),
            display_name: display_name.to_string(),
            joined_at,
        });
        Ok(true)
    }

    async fn is_participant(&self, id: SessionId, member_id: MemberId) -> Result<bool, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .participants
            .iter()
            .any(|p| p.session_id == id && p.member_id == member_id))
    }

    async fn get_participants(&self, id: SessionId) -> Result<Vec<Participant>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .participants
            .iter()
            .filter(|p| p.session_id == id)
            .cloned()
            .collect())
    }

    async fn open_sessions_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<SessionId>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .filter(|s| !s.closed && s.signup_deadline <= now)
            .map(|s| s.id)
            .collect())
    }

    async fn close_session(&self, id: SessionId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.sessions.iter_mut().find(|s| s.id == id) {
            Some(s) if !s.closed => {
                s.closed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_daily_time(&self) -> Result<String, RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .daily_time
            .clone()
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_daily_time(&self, time: DailyTime) -> Result<(), RepositoryError> {
        self.inner.lock().unwrap().daily_time = Some(time.to_string());
        Ok(())
    }

    async fn ensure_default_settings(&self, default_time: DailyTime) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.daily_time.is_none() {
            inner.daily_time = Some(default_time.to_string());
        }
        Ok(())
    }
}

/// Everything a [`RecordingNotifier`] was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Invite { chat_id: ChatId, text: String, token: ActionToken },
    Text { chat_id: ChatId, text: String },
    Ack { ack_id: String, text: String },
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    next_ref: AtomicU32,
    pub fail_invites: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id: c, text } if c == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn invites(&self) -> Vec<(ChatId, ActionToken)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Invite { chat_id, token, .. } => Some((chat_id, token)),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn post_invite(&self, chat_id: ChatId, text: &str, token: ActionToken) -> Result<MessageRef, NotifyError> {
        if self.fail_invites.load(Ordering::SeqCst) {
            return Err(NotifyError::SendFailed("chat unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Invite {
            chat_id,
            text: text.to_string(),
            token,
        });
        Ok(MessageRef(self.next_ref.fetch_add(1, Ordering::SeqCst) as i64 + 100))
    }

    async fn post_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn acknowledge(&self, ack_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(Sent::Ack {
            ack_id: ack_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Wall clock pinned to tokio's (pausable) time source, so paused-time tests
/// see the wall clock advance together with timers.
#[derive(Clone)]
pub struct TokioClock {
    base_wall: DateTime<Utc>,
    base_instant: tokio::time::Instant,
    offset: Arc<Mutex<TimeDelta>>,
}

impl TokioClock {
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            base_wall: wall,
            base_instant: tokio::time::Instant::now(),
            offset: Arc::new(Mutex::new(TimeDelta::zero())),
        }
    }

    /// Step the wall clock without touching tokio time, like an NTP correction.
    pub fn shift(&self, by: TimeDelta) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.base_instant;
        self.base_wall + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero()) + *self.offset.lock().unwrap()
    }
}
