//! Line-delimited JSON bridge over stdio.
//!
//! The messaging transport runs as a separate process. It writes one
//! [`InboundEvent`] per line to our stdin and reads one [`OutboundMessage`]
//! per line from our stdout. Logs go to stderr so stdout stays a clean
//! message stream.

use std::sync::atomic::{AtomicI64, Ordering};

use coffeemate_core::messages::JOIN_BUTTON;
use coffeemate_core::notify::Notifier;
use coffeemate_types::chat::{ChatId, MessageRef};
use coffeemate_types::error::NotifyError;
use coffeemate_types::event::InboundEvent;
use coffeemate_types::session::ActionToken;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// A message for the transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Invitation with one button; pressing it yields `token` back as an
    /// `action_invoked` event.
    Invite {
        message_ref: MessageRef,
        chat_id: ChatId,
        text: String,
        button: String,
        token: String,
    },
    Text {
        chat_id: ChatId,
        text: String,
    },
    Ack {
        ack_id: String,
        text: String,
    },
}

/// Notifier that writes [`OutboundMessage`] lines to a writer (stdout in
/// production).
///
/// Message refs are assigned locally and increase monotonically; the
/// transport maps them to platform message ids if it needs to.
pub struct JsonLinesNotifier<W> {
    writer: Mutex<W>,
    next_ref: AtomicI64,
}

impl JsonLinesNotifier<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesNotifier<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            next_ref: AtomicI64::new(1),
        }
    }

    /// Consume the notifier and return the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn emit(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let mut line = serde_json::to_string(message).map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;

        written.map_err(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe => NotifyError::Closed,
            _ => NotifyError::SendFailed(e.to_string()),
        })
    }
}

impl<W: AsyncWrite + Unpin + Send> Notifier for JsonLinesNotifier<W> {
    async fn post_invite(&self, chat_id: ChatId, text: &str, token: ActionToken) -> Result<MessageRef, NotifyError> {
        let message_ref = MessageRef(self.next_ref.fetch_add(1, Ordering::SeqCst));
        self.emit(&OutboundMessage::Invite {
            message_ref,
            chat_id,
            text: text.to_string(),
            button: JOIN_BUTTON.to_string(),
            token: token.to_string(),
        })
        .await?;
        Ok(message_ref)
    }

    async fn post_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        self.emit(&OutboundMessage::Text {
            chat_id,
            text: text.to_string(),
        })
        .await
    }

    async fn acknowledge(&self, ack_id: &str, text: &str) -> Result<(), NotifyError> {
        self.emit(&OutboundMessage::Ack {
            ack_id: ack_id.to_string(),
            text: text.to_string(),
        })
        .await
    }
}

/// Read [`InboundEvent`] lines from `reader` into `events`.
///
/// Blank lines are ignored and malformed lines are logged and skipped.
/// Returns on EOF, on a read error, when the receiver is gone, or when
/// `cancel` fires. Dropping `events` on return closes the feed.
pub async fn read_events<R>(reader: R, events: mpsc::Sender<InboundEvent>, cancel: CancellationToken)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no: u64 = 0;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("event reader cancelled");
                return;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(lines = line_no, "event feed reached EOF");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read event feed");
                return;
            }
        };
        line_no += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<InboundEvent>(trimmed) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed event");
                continue;
            }
        };

        if events.send(event).await.is_err() {
            tracing::debug!("event consumer gone, stopping reader");
            return;
        }
    }
}
