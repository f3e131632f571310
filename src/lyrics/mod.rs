pub mod genius;
pub mod ovh;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::LyricsError;
use crate::query::LyricsQuery;

/// Lyrics found for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lyrics {
    pub title: String,
    pub artist: Option<String>,
    pub text: String,
    /// Name of the provider that answered.
    pub source: &'static str,
}

/// A service that can look up song lyrics.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, query: &LyricsQuery) -> Result<Lyrics, LyricsError>;
}

/// Asks each provider in turn and returns the first hit.
///
/// When nobody has the song, the first real failure (network, credentials,
/// unexpected status) is reported in preference to `NotFound`, so the user
/// is told to retry rather than that the song does not exist.
pub struct ProviderChain {
    providers: Vec<Arc<dyn LyricsProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LyricsProvider>>) -> Self {
        Self { providers }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl LyricsProvider for ProviderChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn lookup(&self, query: &LyricsQuery) -> Result<Lyrics, LyricsError> {
        let mut first_failure: Option<LyricsError> = None;

        for provider in &self.providers {
            match provider.lookup(query).await {
                Ok(lyrics) => {
                    debug!("'{}' found lyrics for '{}'", provider.name(), query);
                    return Ok(lyrics);
                }
                Err(e) if e.is_not_found() => {
                    debug!("'{}' has no lyrics for '{}'", provider.name(), query);
                }
                Err(e) => {
                    warn!("Lyrics provider '{}' failed for '{}': {}", provider.name(), query, e);
                    first_failure.get_or_insert(e);
                }
            }
        }

        Err(first_failure.unwrap_or(LyricsError::NotFound))
    }
}

/// Normalize provider text: unify line endings and drop surrounding blank space.
pub(crate) fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider that counts how often it is asked.
    pub(crate) struct FakeProvider {
        pub name: &'static str,
        pub answer: fn() -> Result<Lyrics, LyricsError>,
        pub calls: AtomicUsize,
    }

    impl FakeProvider {
        pub(crate) fn new(
            name: &'static str,
            answer: fn() -> Result<Lyrics, LyricsError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LyricsProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn lookup(&self, _query: &LyricsQuery) -> Result<Lyrics, LyricsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.answer)()
        }
    }

    pub(crate) fn found() -> Result<Lyrics, LyricsError> {
        Ok(Lyrics {
            title: "Bohemian Rhapsody".to_string(),
            artist: Some("Queen".to_string()),
            text: "Is this the real life?\nIs this just fantasy?".to_string(),
            source: "fake",
        })
    }

    pub(crate) fn not_found() -> Result<Lyrics, LyricsError> {
        Err(LyricsError::NotFound)
    }

    pub(crate) fn unauthorized() -> Result<Lyrics, LyricsError> {
        Err(LyricsError::Unauthorized)
    }

    fn chain_of(providers: &[&Arc<FakeProvider>]) -> ProviderChain {
        ProviderChain::new(
            providers
                .iter()
                .map(|p| -> Arc<dyn LyricsProvider> { (*p).clone() })
                .collect(),
        )
    }

    fn query() -> LyricsQuery {
        LyricsQuery::parse("Queen - Bohemian Rhapsody").unwrap()
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_hit() {
        let first = FakeProvider::new("first", found);
        let second = FakeProvider::new("second", found);
        let chain = chain_of(&[&first, &second]);

        let lyrics = chain.lookup(&query()).await.unwrap();
        assert_eq!(lyrics.title, "Bohemian Rhapsody");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_chain_falls_through_misses_and_failures() {
        let miss = FakeProvider::new("miss", not_found);
        let broken = FakeProvider::new("broken", unauthorized);
        let hit = FakeProvider::new("hit", found);
        let chain = chain_of(&[&miss, &broken, &hit]);

        assert!(chain.lookup(&query()).await.is_ok());
        assert_eq!(miss.calls(), 1);
        assert_eq!(broken.calls(), 1);
        assert_eq!(hit.calls(), 1);
    }

    #[tokio::test]
    async fn test_chain_all_misses_is_not_found() {
        let chain = chain_of(&[
            &FakeProvider::new("a", not_found),
            &FakeProvider::new("b", not_found),
        ]);
        assert!(chain.lookup(&query()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_chain_prefers_failure_over_not_found() {
        let chain = chain_of(&[
            &FakeProvider::new("a", not_found),
            &FakeProvider::new("b", unauthorized),
        ]);
        assert!(matches!(
            chain.lookup(&query()).await,
            Err(LyricsError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_empty_chain_is_not_found() {
        let chain = ProviderChain::new(Vec::new());
        assert!(chain.lookup(&query()).await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("\r\n line one\r\nline two \r\n\r\n"), "line one\nline two");
    }
}
