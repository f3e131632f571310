use std::sync::Arc;

use teloxide::utils::html;
use tracing::{debug, info, warn};

use crate::error::{LyricsError, QueryError, TransportError};
use crate::lyrics::{Lyrics, LyricsProvider};
use crate::platform::{IncomingRequest, Messenger, OutgoingReply};
use crate::query::LyricsQuery;

pub const USAGE_TEXT: &str = "Send me a song as \"Artist - Title\" or just a song title.\n\n\
     Examples:\n\
     Queen - Bohemian Rhapsody\n\
     Adele - Hello\n\
     Imagine\n\n\
     Commands:\n\
     /help - Show this message";

pub const START_TEXT: &str = "🎵 Hi! I'm a lyrics bot.\n\n\
     Send me a song as \"Artist - Title\" or just a song title and I'll find the lyrics.\n\
     Example: Queen - Bohemian Rhapsody\n\n\
     Commands:\n\
     /help - Show usage and examples";

pub const NOT_FOUND_TEXT: &str = "❌ Sorry, I couldn't find lyrics for that song.";

pub const LOOKUP_FAILED_TEXT: &str =
    "⚠️ I couldn't reach the lyrics service right now. Please try again later.";

/// Turns one chat message into the replies for it.
///
/// Holds no per-user state; every call is an independent lookup.
pub struct QueryHandler {
    lyrics: Arc<dyn LyricsProvider>,
    max_message_len: usize,
}

impl QueryHandler {
    pub fn new(lyrics: Arc<dyn LyricsProvider>, max_message_len: usize) -> Self {
        Self {
            lyrics,
            max_message_len,
        }
    }

    /// Build the replies for a request. Lookup failures become user-facing
    /// messages; nothing here is fatal.
    pub async fn handle(&self, request: &IncomingRequest) -> Vec<OutgoingReply> {
        let chat_id = request.chat_id;
        let text = request.text.trim();

        if let Some(command) = text.strip_prefix('/') {
            return vec![OutgoingReply::plain(chat_id, command_reply(command))];
        }

        let query = match LyricsQuery::parse(text) {
            Ok(query) => query,
            Err(QueryError::Empty) => {
                debug!("Empty query from chat {}", chat_id);
                return vec![OutgoingReply::plain(chat_id, USAGE_TEXT)];
            }
        };

        info!("Looking up lyrics for '{}' (chat {})", query, chat_id);

        match self.lyrics.lookup(&query).await {
            Ok(lyrics) => {
                info!(
                    "Found lyrics for '{}' via {} ({} bytes)",
                    query,
                    lyrics.source,
                    lyrics.text.len()
                );
                self.format_lyrics(chat_id, &lyrics)
            }
            Err(LyricsError::NotFound) => {
                info!("No lyrics found for '{}'", query);
                vec![OutgoingReply::plain(chat_id, NOT_FOUND_TEXT)]
            }
            Err(e) => {
                warn!("Lyrics lookup failed for '{}': {}", query, e);
                vec![OutgoingReply::plain(chat_id, LOOKUP_FAILED_TEXT)]
            }
        }
    }

    /// Handle a request and send its replies in order. Stops at the first
    /// transport failure; the remaining replies are dropped.
    pub async fn handle_and_send(
        &self,
        request: &IncomingRequest,
        messenger: &dyn Messenger,
    ) -> Result<(), TransportError> {
        for reply in self.handle(request).await {
            messenger.send(&reply).await?;
        }
        Ok(())
    }

    fn format_lyrics(&self, chat_id: i64, lyrics: &Lyrics) -> Vec<OutgoingReply> {
        let header = match &lyrics.artist {
            Some(artist) => format!(
                "🎶 <b>{}</b> — <i>{}</i>",
                html::escape(&lyrics.title),
                html::escape(artist)
            ),
            None => format!("🎶 <b>{}</b>", html::escape(&lyrics.title)),
        };

        let mut replies = vec![OutgoingReply::html(chat_id, header)];
        replies.extend(
            split_message(&lyrics.text, self.max_message_len)
                .into_iter()
                // Telegram rejects messages with no visible text
                .filter(|chunk| !chunk.trim().is_empty())
                .map(|chunk| OutgoingReply::plain(chat_id, chunk)),
        );
        replies
    }
}

fn command_reply(command: &str) -> &'static str {
    // "/start@SomeBot args" -> "start"
    let name = command
        .split_whitespace()
        .next()
        .and_then(|c| c.split('@').next())
        .unwrap_or_default();

    match name {
        "start" => START_TEXT,
        _ => USAGE_TEXT,
    }
}

/// Split text into chunks of at most `max_len` bytes.
///
/// Breaks after a blank line, a newline or a space when one is available,
/// and never inside a UTF-8 character. A break that would leave a
/// whitespace-only chunk is skipped; such a chunk can only come from a
/// whitespace run at least `max_len` long. The chunks concatenate back to `text`.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // Limit is narrower than a single character
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }

        let actual_end = if end < text.len() {
            let window = &text[start..end];
            // A break is only usable if the chunk before it has some text
            let has_text = |len: &usize| !window[..*len].trim().is_empty();
            window
                .rfind("\n\n")
                .map(|pos| pos + 2)
                .filter(has_text)
                .or_else(|| window.rfind('\n').map(|pos| pos + 1).filter(has_text))
                .or_else(|| window.rfind(' ').map(|pos| pos + 1).filter(has_text))
                .map_or(end, |len| start + len)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}
