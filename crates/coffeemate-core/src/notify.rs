//! Outbound messaging port.
//!
//! The transport that actually delivers messages to chats is an external
//! collaborator; the engine only needs to post text, post an invite carrying
//! a signup control, and answer a member's action.

use coffeemate_types::chat::{ChatId, MessageRef};
use coffeemate_types::error::NotifyError;
use coffeemate_types::session::ActionToken;

/// Trait for posting messages into chats.
///
/// Implementations live in coffeemate-infra (e.g., the JSON-lines bridge).
pub trait Notifier: Send + Sync {
    /// Post an invitation with a control that emits `token` when pressed.
    fn post_invite(
        &self,
        chat_id: ChatId,
        text: &str,
        token: ActionToken,
    ) -> impl std::future::Future<Output = Result<MessageRef, NotifyError>> + Send;

    /// Post a plain text message.
    fn post_text(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;

    /// Answer a specific action with a short acknowledgment.
    fn acknowledge(
        &self,
        ack_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}
