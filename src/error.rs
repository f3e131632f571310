use reqwest::StatusCode;
use thiserror::Error;

/// The user's text could not be turned into a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty query")]
    Empty,
}

/// Failure of a lyrics lookup. `NotFound` is the expected miss; everything
/// else means the provider could not be asked properly.
#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("no lyrics found")]
    NotFound,

    #[error("request to lyrics provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("lyrics provider returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("lyrics provider rejected the credentials")]
    Unauthorized,

    #[error("invalid response from lyrics provider: {0}")]
    InvalidResponse(String),
}

impl LyricsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LyricsError::NotFound)
    }
}

/// Failure to deliver a reply to the chat.
#[derive(Error, Debug)]
#[error("failed to send reply to chat {chat_id}: {message}")]
pub struct TransportError {
    pub chat_id: i64,
    pub message: String,
}
