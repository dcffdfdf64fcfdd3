//! Inbound events delivered by the messaging transport.

use serde::{Deserialize, Serialize};

use crate::chat::ChatId;
use crate::session::MemberId;

/// An event from the external event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// The bot was added to (or promoted in) a group chat.
    ChatAdded {
        chat_id: ChatId,
        #[serde(default)]
        title: String,
    },

    /// A member pressed the control attached to an invite.
    ActionInvoked {
        /// Opaque token attached when the invite was posted.
        token: String,
        member_id: MemberId,
        #[serde(default)]
        handle: Option<String>,
        /// First/last name parts as reported by the platform.
        #[serde(default)]
        name_parts: Vec<String>,
        /// Transport handle used to answer this specific action.
        ack_id: String,
    },
}
