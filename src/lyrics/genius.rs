use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{normalize_text, Lyrics, LyricsProvider};
use crate::error::LyricsError;
use crate::query::LyricsQuery;

const LYRICS_CONTAINER: &str = "data-lyrics-container=\"true\"";
const EXCLUDED_FROM_SELECTION: &str = "data-exclude-from-selection=\"true\"";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "type")]
    hit_type: String,
    result: SongHit,
}

#[derive(Debug, Clone, Deserialize)]
struct SongHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    primary_artist: Option<ArtistHit>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistHit {
    name: String,
}

/// Genius search API plus lyrics scraped from the song page.
///
/// Genius does not serve lyrics through its API, only the song page URL.
/// The lyrics are the text of the page's lyrics container elements.
pub struct GeniusClient {
    client: reqwest::Client,
    api_url: Url,
    token: String,
    excluded_terms: Vec<String>,
}

impl GeniusClient {
    pub fn new(
        api_url: &str,
        token: &str,
        excluded_terms: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .with_context(|| format!("Invalid Genius API URL: {}", api_url))?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("Genius API URL cannot carry a path: {}", api_url);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url,
            token: token.to_string(),
            excluded_terms: excluded_terms
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
        })
    }

    fn search_url(&self, q: &str) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("search");
        }
        url.query_pairs_mut().append_pair("q", q);
        url
    }

    fn is_excluded(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.excluded_terms.iter().any(|term| title.contains(term))
    }

    /// First song hit for `q` that isn't a remix/live version.
    async fn search(&self, q: &str) -> Result<Option<SongHit>, LyricsError> {
        debug!("Searching Genius for '{}'", q);

        let response = self
            .client
            .get(self.search_url(q))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LyricsError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LyricsError::Api { status, body });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| LyricsError::InvalidResponse(e.to_string()))?;

        Ok(body
            .response
            .hits
            .into_iter()
            .filter(|hit| hit.hit_type == "song")
            .map(|hit| hit.result)
            .find(|song| !song.url.is_empty() && !self.is_excluded(&song.title)))
    }

    async fn fetch_page_lyrics(&self, url: &str) -> Result<String, LyricsError> {
        debug!("Fetching Genius page: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LyricsError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LyricsError::Api { status, body });
        }

        let html = response.text().await?;
        let text = extract_lyrics(&html);
        if text.is_empty() {
            return Err(LyricsError::NotFound);
        }
        Ok(text)
    }
}

/// Search phrases to try, most specific first.
fn search_phrases(query: &LyricsQuery) -> Vec<String> {
    match &query.artist {
        Some(artist) => vec![
            format!("{} {}", artist, query.title),
            format!("{} {}", query.title, artist),
        ],
        None => vec![query.title.clone()],
    }
}

#[async_trait]
impl LyricsProvider for GeniusClient {
    fn name(&self) -> &'static str {
        "genius"
    }

    async fn lookup(&self, query: &LyricsQuery) -> Result<Lyrics, LyricsError> {
        for phrase in search_phrases(query) {
            let Some(song) = self.search(&phrase).await? else {
                continue;
            };

            let text = match self.fetch_page_lyrics(&song.url).await {
                Ok(text) => text,
                Err(e) if e.is_not_found() => {
                    debug!("Genius page for '{}' has no lyrics", phrase);
                    continue;
                }
                Err(e) => return Err(e),
            };

            return Ok(Lyrics {
                title: song.title,
                artist: song.primary_artist.map(|a| a.name),
                text,
                source: self.name(),
            });
        }

        Err(LyricsError::NotFound)
    }
}

/// Plain text of every lyrics container on a Genius song page.
pub(crate) fn extract_lyrics(html: &str) -> String {
    let mut sections = Vec::new();
    let mut rest = html;

    while let Some(pos) = rest.find(LYRICS_CONTAINER) {
        let after_marker = &rest[pos + LYRICS_CONTAINER.len()..];
        let Some(open_end) = after_marker.find('>') else {
            break;
        };
        let content = &after_marker[open_end + 1..];
        let len = inner_len(content);

        let section = html_to_text(&strip_excluded(&content[..len]));
        let section = section.trim();
        if !section.is_empty() {
            sections.push(section.to_string());
        }
        rest = &content[len..];
    }

    normalize_text(&sections.join("\n"))
}

/// Byte length of a div's inner HTML, given the text right after its opening tag.
fn inner_len(html: &str) -> usize {
    let mut depth = 1usize;
    let mut offset = 0;

    while let Some(rel) = html[offset..].find('<') {
        let at = offset + rel;
        let tag = &html[at..];
        if tag.starts_with("</div") {
            depth -= 1;
            if depth == 0 {
                return at;
            }
        } else if tag.starts_with("<div") {
            depth += 1;
        }
        offset = at + 1;
    }

    html.len()
}

/// Drop headers Genius marks as not part of the lyrics ("N Contributors", etc).
fn strip_excluded(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(pos) = rest.find(EXCLUDED_FROM_SELECTION) {
        let Some(tag_start) = rest[..pos].rfind('<') else {
            break;
        };
        let Some(open_end) = rest[pos..].find('>') else {
            break;
        };
        out.push_str(&rest[..tag_start]);

        let content = &rest[pos + open_end + 1..];
        let len = inner_len(content);
        let after = &content[len..];
        // Skip the element's closing tag as well
        rest = match after.find('>') {
            Some(close_end) => &after[close_end + 1..],
            None => "",
        };
    }

    out.push_str(rest);
    out
}

/// Strip tags, turning `<br>` into newlines, and decode entities.
fn html_to_text(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut rest = fragment;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            rest = "";
            break;
        };
        if is_line_break(&rest[start + 1..start + end]) {
            out.push('\n');
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);

    decode_entities(&out)
}

fn is_line_break(tag: &str) -> bool {
    tag.trim_end_matches('/')
        .split_whitespace()
        .next()
        .is_some_and(|name| name.eq_ignore_ascii_case("br"))
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&candidate[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = match name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => name.strip_prefix('#')?.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
