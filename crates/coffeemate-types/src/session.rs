//! Daily signup session, participant and grouping types.
//!
//! A session is the per-chat, per-calendar-date signup window. Members opt in
//! while it is open; at close time the participants are partitioned into
//! small groups and the result is announced in the chat.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::chat::{ChatId, MessageRef};

/// Store-assigned numeric session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Calendar date of a session. The day boundary is always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionDate(pub NaiveDate);

impl SessionDate {
    /// The UTC calendar date containing `instant`.
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }
}

impl fmt::Display for SessionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for SessionDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| format!("invalid session date '{s}': {e}"))
    }
}

/// One signup session as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub chat_id: ChatId,
    pub date: SessionDate,
    /// Absolute instant after which no further signups are accepted.
    pub signup_deadline: DateTime<Utc>,
    /// Set once the invitation has actually been posted.
    pub invite_ref: Option<MessageRef>,
    pub closed: bool,
}

impl Session {
    /// Whether a signup arriving at `now` may be accepted.
    ///
    /// The deadline is authoritative; the closed flag is an eventual marker
    /// written by the closer sweep, and either one rejects.
    pub fn accepts_signups_at(&self, now: DateTime<Utc>) -> bool {
        !self.closed && now <= self.signup_deadline
    }
}

/// Platform-assigned member (user) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A member who successfully joined an open session. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub session_id: SessionId,
    pub member_id: MemberId,
    pub handle: Option<String>,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Project the participant onto the partitioner's input type.
    ///
    /// Rows written by older builds may carry an empty display name, so the
    /// name is re-resolved rather than copied.
    pub fn to_member(&self) -> Member {
        let name = if self.display_name.trim().is_empty() {
            resolve_display_name(self.member_id, self.handle.as_deref(), &[])
        } else {
            self.display_name.clone()
        };
        Member {
            id: self.member_id,
            name,
        }
    }
}

/// Resolve the presentable name of a member.
///
/// Order: explicit name parts joined with a space, then `@handle`, then a
/// fallback synthesized from the member id. Never returns an empty string.
pub fn resolve_display_name(member_id: MemberId, handle: Option<&str>, name_parts: &[String]) -> String {
    let joined = name_parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !joined.is_empty() {
        return joined;
    }

    match handle.map(|h| h.trim().trim_start_matches('@')) {
        Some(h) if !h.is_empty() => format!("@{h}"),
        _ => format!("id:{member_id}"),
    }
}

/// Result of a signup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
    WindowClosed,
}

impl fmt::Display for JoinOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinOutcome::Joined => write!(f, "joined"),
            JoinOutcome::AlreadyJoined => write!(f, "already_joined"),
            JoinOutcome::WindowClosed => write!(f, "window_closed"),
        }
    }
}

/// Partitioner input: a member with a resolved name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

/// A small group produced at close time. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    pub members: Vec<Member>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// What closing a session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizationResult {
    /// Another caller already closed this session; nothing to publish.
    AlreadyClosed,
    /// Closed with nobody signed up. The caller posts a plain notice.
    NoParticipants { chat_id: ChatId },
    /// Closed and partitioned.
    Grouped {
        chat_id: ChatId,
        members: Vec<Member>,
        groups: Vec<Group>,
    },
}

/// Callback payload attached to an invite's signup control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionToken {
    Join(SessionId),
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionToken::Join(id) => write!(f, "join:{id}"),
        }
    }
}

impl FromStr for ActionToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("join", id)) => id
                .parse::<SessionId>()
                .map(ActionToken::Join)
                .map_err(|e| format!("invalid session id in action token '{s}': {e}")),
            _ => Err(format!("unknown action token: '{s}'")),
        }
    }
}
