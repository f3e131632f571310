pub mod telegram;

use async_trait::async_trait;

use crate::error::TransportError;

/// A text message received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    /// Platform chat ID the reply goes back to
    pub chat_id: i64,
    /// The message text
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    Plain,
    /// Telegram HTML subset; the text must already be escaped.
    Html,
}

/// A message to send back to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub chat_id: i64,
    pub text: String,
    pub format: ReplyFormat,
}

impl OutgoingReply {
    pub fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: ReplyFormat::Plain,
        }
    }

    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: ReplyFormat::Html,
        }
    }
}

/// Delivers replies to a chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, reply: &OutgoingReply) -> Result<(), TransportError>;
}
