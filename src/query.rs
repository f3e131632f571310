use std::fmt;

use crate::error::QueryError;

/// Separators between artist and title, highest priority first.
const SPACED_SEPARATORS: [&str; 3] = [" - ", " – ", " — "];
const BARE_SEPARATOR: char = '-';

/// What the user asked for: a title, optionally narrowed by artist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    pub title: String,
    pub artist: Option<String>,
}

impl LyricsQuery {
    /// Parse `Artist - Title`, or a bare title.
    ///
    /// Spaced separators win over a bare hyphen so that names like
    /// `Jay-Z - Empire State of Mind` split in the right place. If one side
    /// of the separator is blank the other side becomes the title.
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryError::Empty);
        }

        let split = SPACED_SEPARATORS
            .iter()
            .find_map(|sep| text.split_once(sep))
            .or_else(|| text.split_once(BARE_SEPARATOR));

        let (artist, title) = match split {
            Some((left, right)) => (left.trim(), right.trim()),
            None => return Ok(Self::title_only(text)),
        };

        match (artist.is_empty(), title.is_empty()) {
            (false, false) => Ok(Self {
                title: title.to_string(),
                artist: Some(artist.to_string()),
            }),
            (true, false) => Ok(Self::title_only(title)),
            (false, true) => Ok(Self::title_only(artist)),
            (true, true) => Err(QueryError::Empty),
        }
    }

    fn title_only(title: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: None,
        }
    }

    /// The same query with artist and title exchanged, for users who type
    /// `Title - Artist`.
    pub fn swapped(&self) -> Option<Self> {
        self.artist.as_ref().map(|artist| Self {
            title: artist.clone(),
            artist: Some(self.title.clone()),
        })
    }
}

impl fmt::Display for LyricsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artist {
            Some(artist) => write!(f, "{} - {}", artist, self.title),
            None => write!(f, "{}", self.title),
        }
    }
}
