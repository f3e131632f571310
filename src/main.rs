mod config;
mod error;
mod handler;
mod lyrics;
mod platform;
mod query;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::handler::QueryHandler;
use crate::lyrics::genius::GeniusClient;
use crate::lyrics::ovh::OvhClient;
use crate::lyrics::{LyricsProvider, ProviderChain};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before the log filter is built; it may set RUST_LOG
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(log_filter("RUST_LOG"))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing .env is fine; credentials may come from config.toml
    if let Ok(path) = dotenv {
        info!("Loaded environment from: {}", path.display());
    }

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let providers = build_providers(&config)?;
    info!("Configuration loaded successfully");
    info!("  Lyrics providers: {:?}", providers.names());
    info!("  Max message length: {}", config.max_message_len());

    let handler = Arc::new(QueryHandler::new(
        Arc::new(providers),
        config.max_message_len(),
    ));

    info!("Bot is starting...");
    platform::telegram::run(Arc::new(config), handler).await?;

    info!("Bot stopped");
    Ok(())
}

/// lyrics.ovh always, Genius only when a token is configured.
fn build_providers(config: &Config) -> Result<ProviderChain> {
    let lyrics = &config.lyrics;
    let mut providers: Vec<Arc<dyn LyricsProvider>> = vec![Arc::new(OvhClient::new(
        &lyrics.ovh_base_url,
        lyrics.request_timeout(),
    )?)];

    match lyrics.genius_token() {
        Some(token) => providers.push(Arc::new(GeniusClient::new(
            &lyrics.genius_api_url,
            token,
            lyrics.excluded_terms.clone(),
            lyrics.request_timeout(),
        )?)),
        None => warn!(
            "GENIUS_TOKEN not set: running with lyrics.ovh only, title-only searches will find nothing"
        ),
    }

    Ok(ProviderChain::new(providers))
}

/// Log filter from the `var` environment variable, or the default levels.
fn log_filter(var: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| "info,lyricbot=debug".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter_defaults_without_env() {
        let filter = log_filter("LYRICBOT_TEST_UNSET_LOG");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_log_filter_reads_level_from_dotenv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "LYRICBOT_TEST_DOTENV_LOG=warn").unwrap();

        dotenvy::from_path(file.path()).unwrap();
        let filter = log_filter("LYRICBOT_TEST_DOTENV_LOG");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
