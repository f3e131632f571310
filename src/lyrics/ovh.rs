use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{normalize_text, Lyrics, LyricsProvider};
use crate::error::LyricsError;
use crate::query::LyricsQuery;

#[derive(Debug, Deserialize)]
struct OvhResponse {
    #[serde(default)]
    lyrics: Option<String>,
}

/// Client for the keyless lyrics.ovh API. It needs both artist and title.
pub struct OvhClient {
    client: reqwest::Client,
    base_url: Url,
}

impl OvhClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid lyrics.ovh base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("lyrics.ovh base URL cannot carry a path: {}", base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn lyrics_url(&self, artist: &str, title: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["v1", artist, title]);
        }
        url
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<String, LyricsError> {
        let url = self.lyrics_url(artist, title);
        debug!("Requesting lyrics.ovh: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LyricsError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LyricsError::Api { status, body });
        }

        let body: OvhResponse = response
            .json()
            .await
            .map_err(|e| LyricsError::InvalidResponse(e.to_string()))?;

        body.lyrics
            .map(|text| normalize_text(&text))
            .filter(|text| !text.is_empty())
            .ok_or(LyricsError::NotFound)
    }
}

#[async_trait]
impl LyricsProvider for OvhClient {
    fn name(&self) -> &'static str {
        "lyrics.ovh"
    }

    async fn lookup(&self, query: &LyricsQuery) -> Result<Lyrics, LyricsError> {
        let Some(artist) = query.artist.as_deref() else {
            return Err(LyricsError::NotFound);
        };

        let (title, artist, text) = match self.fetch(artist, &query.title).await {
            Ok(text) => (query.title.clone(), artist.to_string(), text),
            // Users often type "Title - Artist"
            Err(LyricsError::NotFound) => {
                let text = self.fetch(&query.title, artist).await?;
                (artist.to_string(), query.title.clone(), text)
            }
            Err(e) => return Err(e),
        };

        Ok(Lyrics {
            title,
            artist: Some(artist),
            text,
            source: self.name(),
        })
    }
}
