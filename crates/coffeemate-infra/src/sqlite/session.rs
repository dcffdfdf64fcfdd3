//! SQLite session store implementation.
//!
//! Implements `SessionStore` from `coffeemate-core`. Reads go through the
//! reader pool, writes through the single-connection writer pool. Datetimes
//! are stored as RFC3339 UTC strings with fixed millisecond precision, so
//! lexicographic comparison in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use coffeemate_core::repository::session::SessionStore;
use coffeemate_types::chat::{Chat, ChatId, MessageRef};
use coffeemate_types::error::RepositoryError;
use coffeemate_types::schedule::DailyTime;
use coffeemate_types::session::{MemberId, Participant, Session, SessionDate, SessionId};
use sqlx::Row;

use super::pool::DatabasePool;

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: i64,
    chat_id: i64,
    session_date: String,
    signup_deadline: String,
    invite_message_id: Option<i64>,
    closed: bool,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            session_date: row.try_get("session_date")?,
            signup_deadline: row.try_get("signup_deadline")?,
            invite_message_id: row.try_get("invite_message_id")?,
            closed: row.try_get("closed")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        Ok(Session {
            id: SessionId(self.id),
            chat_id: ChatId(self.chat_id),
            date: parse_date(&self.session_date)?,
            signup_deadline: parse_datetime(&self.signup_deadline)?,
            invite_ref: self.invite_message_id.map(MessageRef),
            closed: self.closed,
        })
    }
}

struct ParticipantRow {
    session_id: i64,
    user_id: i64,
    username: Option<String>,
    display_name: String,
    joined_at: String,
}

impl ParticipantRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            joined_at: row.try_get("joined_at")?,
        })
    }

    fn into_participant(self) -> Result<Participant, RepositoryError> {
        Ok(Participant {
            session_id: SessionId(self.session_id),
            member_id: MemberId(self.user_id),
            handle: self.username,
            display_name: self.display_name,
            joined_at: parse_datetime(&self.joined_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(s: &str) -> Result<SessionDate, RepositoryError> {
    s.parse()
        .map_err(|e| RepositoryError::Query(format!("invalid session date: {e}")))
}

/// Classify a sqlx error: lock contention is retryable, unique violations are
/// conflicts, everything else is a query failure.
fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::PoolTimedOut => RepositoryError::Busy(e.to_string()),
        sqlx::Error::PoolClosed => RepositoryError::Connection,
        sqlx::Error::Database(db_err) => {
            // Extended result codes carry the primary code in the low byte.
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            if matches!(primary, Some(SQLITE_BUSY | SQLITE_LOCKED)) {
                RepositoryError::Busy(db_err.message().to_string())
            } else if db_err.is_unique_violation() {
                RepositoryError::Conflict(db_err.message().to_string())
            } else {
                RepositoryError::Query(e.to_string())
            }
        }
        _ => RepositoryError::Query(e.to_string()),
    }
}

const SESSION_COLUMNS: &str =
    "id, chat_id, session_date, signup_deadline, invite_message_id, closed";

// ---------------------------------------------------------------------------
// SessionStore implementation
// ---------------------------------------------------------------------------

impl SessionStore for SqliteSessionStore {
    async fn upsert_chat(&self, chat: &Chat) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chats (chat_id, title, created_at) VALUES (?, ?, ?)
               ON CONFLICT (chat_id) DO UPDATE SET title = excluded.title"#,
        )
        .bind(chat.id.0)
        .bind(&chat.title)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_chat_ids(&self) -> Result<Vec<ChatId>, RepositoryError> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT chat_id FROM chats ORDER BY chat_id")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().map(|(id,)| ChatId(id)).collect())
    }

    async fn count_chats(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chats")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }

    async fn create_or_get_session(
        &self,
        chat_id: ChatId,
        date: SessionDate,
        deadline: DateTime<Utc>,
    ) -> Result<SessionId, RepositoryError> {
        // Single statement on the single writer: the (chat_id, session_date)
        // constraint picks the winner, and an existing open session only ever
        // has its deadline pushed later.
        let row = sqlx::query(
            r#"INSERT INTO daily_sessions (chat_id, session_date, signup_deadline, created_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (chat_id, session_date) DO UPDATE SET
                   signup_deadline = CASE
                       WHEN closed = 0 AND excluded.signup_deadline > signup_deadline
                       THEN excluded.signup_deadline
                       ELSE signup_deadline
                   END
               RETURNING id"#,
        )
        .bind(chat_id.0)
        .bind(date.to_string())
        .bind(format_datetime(&deadline))
        .bind(format_datetime(&Utc::now()))
        .fetch_one(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        Ok(SessionId(id))
    }

    async fn set_invite_ref(&self, id: SessionId, invite_ref: MessageRef) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE daily_sessions SET invite_message_id = ? WHERE id = ?")
            .bind(invite_ref.0)
            .bind(id.0)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_session_by_chat_date(
        &self,
        chat_id: ChatId,
        date: SessionDate,
    ) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM daily_sessions WHERE chat_id = ? AND session_date = ?"
        ))
        .bind(chat_id.0)
        .bind(date.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| {
            SessionRow::from_row(&r)
                .map_err(map_sqlx_error)?
                .into_session()
        })
        .transpose()
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM daily_sessions WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| {
            SessionRow::from_row(&r)
                .map_err(map_sqlx_error)?
                .into_session()
        })
        .transpose()
    }

    async fn get_session_info(&self, id: SessionId) -> Result<(ChatId, SessionDate), RepositoryError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT chat_id, session_date FROM daily_sessions WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(map_sqlx_error)?;

        let (chat_id, date) = row.ok_or(RepositoryError::NotFound)?;
        Ok((ChatId(chat_id), parse_date(&date)?))
    }

    async fn add_participant(
        &self,
        id: SessionId,
        member_id: MemberId,
        handle: Option<&str>,
        display_name: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let joined_at = format_datetime(&joined_at);
        // Openness is checked inside the insert, so it serializes with
        // close_session on the single writer.
        let result = sqlx::query(
            r#"INSERT INTO participants (session_id, user_id, username, display_name, joined_at)
               SELECT ?, ?, ?, ?, ?
               WHERE EXISTS (
                   SELECT 1 FROM daily_sessions
                   WHERE id = ? AND closed = 0 AND signup_deadline >= ?
               )"#,
        )
        .bind(id.0)
        .bind(member_id.0)
        .bind(handle)
        .bind(display_name)
        .bind(&joined_at)
        .bind(id.0)
        .bind(&joined_at)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_participant(&self, id: SessionId, member_id: MemberId) -> Result<bool, RepositoryError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM participants WHERE session_id = ? AND user_id = ?")
                .bind(id.0)
                .bind(member_id.0)
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.is_some())
    }

    async fn get_participants(&self, id: SessionId) -> Result<Vec<Participant>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT session_id, user_id, username, display_name, joined_at
               FROM participants WHERE session_id = ?
               ORDER BY joined_at ASC, id ASC"#,
        )
        .bind(id.0)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|r| {
                ParticipantRow::from_row(r)
                    .map_err(map_sqlx_error)?
                    .into_participant()
            })
            .collect()
    }

    async fn open_sessions_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<SessionId>, RepositoryError> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM daily_sessions WHERE closed = 0 AND signup_deadline <= ? ORDER BY id",
        )
        .bind(format_datetime(&now))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().map(|(id,)| SessionId(id)).collect())
    }

    async fn close_session(&self, id: SessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE daily_sessions SET closed = 1 WHERE id = ? AND closed = 0")
            .bind(id.0)
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_daily_time(&self) -> Result<String, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT daily_time FROM settings WHERE id = 1")
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|(time,)| time).ok_or(RepositoryError::NotFound)
    }

    async fn set_daily_time(&self, time: DailyTime) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO settings (id, daily_time) VALUES (1, ?)
               ON CONFLICT (id) DO UPDATE SET daily_time = excluded.daily_time"#,
        )
        .bind(time.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn ensure_default_settings(&self, default_time: DailyTime) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO settings (id, daily_time) VALUES (1, ?)")
            .bind(default_time.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::database_url;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::Arc;

    const CHAT: ChatId = ChatId(-1001);

    async fn test_store() -> SqliteSessionStore {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(&dir.path().join("test.db"));
        let pool = DatabasePool::new(&url).await.unwrap();
        // Leak the tempdir so it is not deleted while the pool is alive.
        std::mem::forget(dir);
        SqliteSessionStore::new(pool)
    }

    async fn store_with_chat() -> SqliteSessionStore {
        let store = test_store().await;
        store
            .upsert_chat(&Chat {
                id: CHAT,
                title: "Coffee".to_string(),
            })
            .await
            .unwrap();
        store
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    fn today() -> SessionDate {
        SessionDate::of(noon())
    }

    #[tokio::test]
    async fn test_upsert_chat_refreshes_title() {
        let store = store_with_chat().await;
        store
            .upsert_chat(&Chat {
                id: CHAT,
                title: "Renamed".to_string(),
            })
            .await
            .unwrap();
        store
            .upsert_chat(&Chat {
                id: ChatId(-5),
                title: String::new(),
            })
            .await
            .unwrap();

        assert_eq!(store.count_chats().await.unwrap(), 2);
        assert_eq!(store.list_chat_ids().await.unwrap(), vec![CHAT, ChatId(-5)]);

        let (title,): (String,) = sqlx::query_as("SELECT title FROM chats WHERE chat_id = ?")
            .bind(CHAT.0)
            .fetch_one(&store.pool().reader)
            .await
            .unwrap();
        assert_eq!(title, "Renamed");
    }

    #[tokio::test]
    async fn test_create_or_get_is_idempotent() {
        let store = store_with_chat().await;
        let deadline = noon() + TimeDelta::minutes(30);

        let a = store.create_or_get_session(CHAT, today(), deadline).await.unwrap();
        let b = store.create_or_get_session(CHAT, today(), deadline).await.unwrap();
        assert_eq!(a, b);

        let session = store.get_session(a).await.unwrap().unwrap();
        assert_eq!(session.chat_id, CHAT);
        assert_eq!(session.date, today());
        assert_eq!(session.signup_deadline, deadline);
        assert!(!session.closed);
        assert!(session.invite_ref.is_none());
    }

    #[tokio::test]
    async fn test_deadline_is_monotonic() {
        let store = store_with_chat().await;
        let id = store
            .create_or_get_session(CHAT, today(), noon() + TimeDelta::minutes(30))
            .await
            .unwrap();

        store
            .create_or_get_session(CHAT, today(), noon() + TimeDelta::minutes(45))
            .await
            .unwrap();
        store
            .create_or_get_session(CHAT, today(), noon() + TimeDelta::minutes(10))
            .await
            .unwrap();

        let session = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(session.signup_deadline, noon() + TimeDelta::minutes(45));
    }

    #[tokio::test]
    async fn test_closed_session_deadline_not_extended() {
        let store = store_with_chat().await;
        let deadline = noon() + TimeDelta::minutes(30);
        let id = store.create_or_get_session(CHAT, today(), deadline).await.unwrap();
        assert!(store.close_session(id).await.unwrap());

        let again = store
            .create_or_get_session(CHAT, today(), noon() + TimeDelta::hours(2))
            .await
            .unwrap();
        assert_eq!(again, id);
        let session = store.get_session(id).await.unwrap().unwrap();
        assert!(session.closed);
        assert_eq!(session.signup_deadline, deadline);
    }

    #[tokio::test]
    async fn test_concurrent_create_yields_one_row() {
        let store = Arc::new(store_with_chat().await);
        let deadline = noon() + TimeDelta::minutes(30);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_or_get_session(CHAT, today(), deadline + TimeDelta::seconds(i))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let ids = futures_util::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect::<Vec<_>>();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM daily_sessions")
            .fetch_one(&store.pool().reader)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let session = store.get_session(ids[0]).await.unwrap().unwrap();
        assert_eq!(session.signup_deadline, deadline + TimeDelta::seconds(15));
    }

    #[tokio::test]
    async fn test_sessions_are_per_chat_and_date() {
        let store = store_with_chat().await;
        store
            .upsert_chat(&Chat {
                id: ChatId(-2),
                title: String::new(),
            })
            .await
            .unwrap();
        let deadline = noon() + TimeDelta::minutes(30);
        let tomorrow = SessionDate::of(noon() + TimeDelta::days(1));

        let a = store.create_or_get_session(CHAT, today(), deadline).await.unwrap();
        let b = store.create_or_get_session(ChatId(-2), today(), deadline).await.unwrap();
        let c = store.create_or_get_session(CHAT, tomorrow, deadline).await.unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);

        let found = store.get_session_by_chat_date(CHAT, tomorrow).await.unwrap().unwrap();
        assert_eq!(found.id, c);
        assert_eq!(store.get_session_info(b).await.unwrap(), (ChatId(-2), today()));
    }

    #[tokio::test]
    async fn test_session_for_unknown_chat_rejected() {
        let store = test_store().await;
        let result = store
            .create_or_get_session(ChatId(-9), today(), noon())
            .await;
        assert!(matches!(result, Err(RepositoryError::Query(_))));
    }

    #[tokio::test]
    async fn test_invite_ref_roundtrip() {
        let store = store_with_chat().await;
        let id = store.create_or_get_session(CHAT, today(), noon()).await.unwrap();

        store.set_invite_ref(id, MessageRef(4242)).await.unwrap();
        let session = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(session.invite_ref, Some(MessageRef(4242)));

        let missing = store.set_invite_ref(SessionId(999), MessageRef(1)).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_missing_session_lookups() {
        let store = test_store().await;
        assert!(store.get_session(SessionId(1)).await.unwrap().is_none());
        assert!(store.get_session_by_chat_date(CHAT, today()).await.unwrap().is_none());
        assert!(matches!(
            store.get_session_info(SessionId(1)).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_participant_is_conflict() {
        let store = store_with_chat().await;
        let id = store.create_or_get_session(CHAT, today(), noon()).await.unwrap();

        let inserted = store
            .add_participant(id, MemberId(7), Some("ada"), "Ada L", noon())
            .await
            .unwrap();
        assert!(inserted);
        let dup = store
            .add_participant(id, MemberId(7), Some("ada"), "Ada L", noon())
            .await;
        assert!(matches!(dup, Err(RepositoryError::Conflict(_))));

        assert!(store.is_participant(id, MemberId(7)).await.unwrap());
        assert!(!store.is_participant(id, MemberId(8)).await.unwrap());
    }

    #[tokio::test]
    async fn test_participants_in_join_order() {
        let store = store_with_chat().await;
        let id = store
            .create_or_get_session(CHAT, today(), noon() + TimeDelta::hours(1))
            .await
            .unwrap();

        let joins = [(3, "Cy"), (1, "Ada"), (2, "Bob")];
        for (offset, (member, name)) in joins.iter().enumerate() {
            store
                .add_participant(
                    id,
                    MemberId(*member),
                    None,
                    name,
                    noon() + TimeDelta::seconds(offset as i64),
                )
                .await
                .unwrap();
        }

        let participants = store.get_participants(id).await.unwrap();
        let names: Vec<&str> = participants.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["Cy", "Ada", "Bob"]);
        assert_eq!(participants[0].joined_at, noon());
        assert!(participants[0].handle.is_none());
    }

    #[tokio::test]
    async fn test_add_participant_rejected_once_closed() {
        let store = store_with_chat().await;
        let id = store
            .create_or_get_session(CHAT, today(), noon() + TimeDelta::hours(1))
            .await
            .unwrap();

        assert!(store.get_participants(id).await.unwrap().is_empty());
        assert!(store.close_session(id).await.unwrap());
        let inserted = store
            .add_participant(id, MemberId(7), Some("ada"), "Ada L", noon())
            .await
            .unwrap();

        assert!(!inserted);
        assert!(store.get_participants(id).await.unwrap().is_empty());
        assert!(!store.is_participant(id, MemberId(7)).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_participant_rejected_after_deadline() {
        let store = store_with_chat().await;
        let id = store.create_or_get_session(CHAT, today(), noon()).await.unwrap();

        let at_deadline = store
            .add_participant(id, MemberId(1), None, "Ada", noon())
            .await
            .unwrap();
        let late = store
            .add_participant(id, MemberId(2), None, "Bob", noon() + TimeDelta::milliseconds(1))
            .await
            .unwrap();
        let unknown = store
            .add_participant(SessionId(999), MemberId(3), None, "Cy", noon())
            .await
            .unwrap();

        assert!(at_deadline);
        assert!(!late);
        assert!(!unknown);
        assert_eq!(store.get_participants(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_sessions_past_deadline() {
        let store = store_with_chat().await;
        for chat in [-2, -3, -4] {
            store
                .upsert_chat(&Chat {
                    id: ChatId(chat),
                    title: String::new(),
                })
                .await
                .unwrap();
        }

        let expired = store
            .create_or_get_session(CHAT, today(), noon() - TimeDelta::seconds(10))
            .await
            .unwrap();
        let exact = store
            .create_or_get_session(ChatId(-2), today(), noon())
            .await
            .unwrap();
        store
            .create_or_get_session(ChatId(-3), today(), noon() + TimeDelta::milliseconds(1))
            .await
            .unwrap();
        let closed = store
            .create_or_get_session(ChatId(-4), today(), noon() - TimeDelta::hours(1))
            .await
            .unwrap();
        store.close_session(closed).await.unwrap();

        let due = store.open_sessions_past_deadline(noon()).await.unwrap();
        assert_eq!(due, vec![expired, exact]);
    }

    #[tokio::test]
    async fn test_close_session_first_caller_wins() {
        let store = store_with_chat().await;
        let id = store.create_or_get_session(CHAT, today(), noon()).await.unwrap();

        assert!(store.close_session(id).await.unwrap());
        assert!(!store.close_session(id).await.unwrap());
        assert!(!store.close_session(SessionId(999)).await.unwrap());
    }

    #[tokio::test]
    async fn test_daily_time_settings() {
        let store = test_store().await;
        assert!(matches!(store.get_daily_time().await, Err(RepositoryError::NotFound)));

        store.ensure_default_settings(DailyTime::DEFAULT).await.unwrap();
        assert_eq!(store.get_daily_time().await.unwrap(), "08:00");

        store.set_daily_time(DailyTime::new(6, 5).unwrap()).await.unwrap();
        assert_eq!(store.get_daily_time().await.unwrap(), "06:05");

        // Existing settings survive a restart's default seeding.
        store.ensure_default_settings(DailyTime::DEFAULT).await.unwrap();
        assert_eq!(store.get_daily_time().await.unwrap(), "06:05");
    }

    #[tokio::test]
    async fn test_garbage_daily_time_is_returned_raw() {
        let store = test_store().await;
        sqlx::query("INSERT INTO settings (id, daily_time) VALUES (1, 'soon')")
            .execute(&store.pool().writer)
            .await
            .unwrap();
        assert_eq!(store.get_daily_time().await.unwrap(), "soon");
        assert_eq!(DailyTime::parse_or_fallback("soon"), DailyTime::FALLBACK);
    }
}
