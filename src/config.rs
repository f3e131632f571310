use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Telegram's hard cap on a single message.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Empty means every user may query the bot.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LyricsConfig {
    /// Enables the Genius fallback when present.
    #[serde(default)]
    pub genius_token: Option<String>,
    #[serde(default = "default_ovh_base_url")]
    pub ovh_base_url: String,
    #[serde(default = "default_genius_api_url")]
    pub genius_api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_excluded_terms")]
    pub excluded_terms: Vec<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_user_ids: Vec::new(),
            max_message_len: default_max_message_len(),
        }
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            genius_token: None,
            ovh_base_url: default_ovh_base_url(),
            genius_api_url: default_genius_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            excluded_terms: default_excluded_terms(),
        }
    }
}

impl LyricsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The Genius token, if one is configured and non-blank.
    pub fn genius_token(&self) -> Option<&str> {
        self.genius_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

fn default_max_message_len() -> usize {
    4000
}

fn default_ovh_base_url() -> String {
    "https://api.lyrics.ovh".to_string()
}

fn default_genius_api_url() -> String {
    "https://api.genius.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_excluded_terms() -> Vec<String> {
    vec!["(Remix)".to_string(), "(Live)".to_string()]
}

impl Config {
    /// Load the config file (if it exists), apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// `load` with the environment supplied by `lookup`.
    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML configuration")
    }

    /// Override credentials from `TELEGRAM_TOKEN` / `GENIUS_TOKEN` when set and non-empty.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("TELEGRAM_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(token) = non_empty("GENIUS_TOKEN") {
            self.lyrics.genius_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("TELEGRAM_TOKEN not set (use [telegram] bot_token or the environment)");
        }
        if self.lyrics.request_timeout_secs == 0 {
            anyhow::bail!("[lyrics] request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Outgoing message chunk size, clamped to what Telegram accepts.
    pub fn max_message_len(&self) -> usize {
        self.telegram.max_message_len.clamp(1, TELEGRAM_MAX_MESSAGE_LEN)
    }

    pub fn is_user_allowed(&self, user_id: u64) -> bool {
        self.telegram.allowed_user_ids.is_empty()
            || self.telegram.allowed_user_ids.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.telegram.max_message_len, 4000);
        assert!(config.telegram.allowed_user_ids.is_empty());
        assert_eq!(config.lyrics.ovh_base_url, "https://api.lyrics.ovh");
        assert_eq!(config.lyrics.genius_api_url, "https://api.genius.com");
        assert_eq!(config.lyrics.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.lyrics.excluded_terms, vec!["(Remix)", "(Live)"]);
        assert!(config.lyrics.genius_token().is_none());
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            [telegram]
            bot_token = "123:abc"
            allowed_user_ids = [1, 2]
            max_message_len = 3000

            [lyrics]
            genius_token = "g-token"
            request_timeout_secs = 5
            excluded_terms = ["(Demo)"]
            "#,
        )
        .unwrap();

        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.max_message_len(), 3000);
        assert!(config.is_user_allowed(2));
        assert!(!config.is_user_allowed(3));
        assert_eq!(config.lyrics.genius_token(), Some("g-token"));
        assert_eq!(config.lyrics.request_timeout_secs, 5);
        assert_eq!(config.lyrics.excluded_terms, vec!["(Demo)"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml(
            r#"
            [telegram]
            bot_token = "from-file"
            "#,
        )
        .unwrap();

        config.apply_env(env(&[("TELEGRAM_TOKEN", "from-env"), ("GENIUS_TOKEN", "genius")]));
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.lyrics.genius_token(), Some("genius"));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = Config::default();
        config.telegram.bot_token = "keep".to_string();
        config.apply_env(env(&[("TELEGRAM_TOKEN", "  "), ("GENIUS_TOKEN", "")]));
        assert_eq!(config.telegram.bot_token, "keep");
        assert!(config.lyrics.genius_token().is_none());
    }

    #[test]
    fn test_missing_token_fails_validation() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_TOKEN"));
    }

    #[test]
    fn test_blank_genius_token_disables_fallback() {
        let config = Config::from_toml("[lyrics]\ngenius_token = \"   \"").unwrap();
        assert!(config.lyrics.genius_token().is_none());
    }

    #[test]
    fn test_max_message_len_is_clamped() {
        let mut config = Config::default();
        config.telegram.max_message_len = 10_000;
        assert_eq!(config.max_message_len(), TELEGRAM_MAX_MESSAGE_LEN);
        config.telegram.max_message_len = 0;
        assert_eq!(config.max_message_len(), 1);
    }

    #[test]
    fn test_load_missing_file_uses_defaults_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config =
            Config::load_with_env(&path, env(&[("TELEGRAM_TOKEN", "env-token")])).unwrap();
        assert_eq!(config.telegram.bot_token, "env-token");
        assert_eq!(config.max_message_len(), 4000);
        assert!(config.lyrics.genius_token().is_none());
    }

    #[test]
    fn test_load_missing_file_without_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let err = Config::load_with_env(&path, env(&[])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_TOKEN"));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[telegram\nbot_token = ").unwrap();

        let err = Config::load_with_env(file.path(), env(&[("TELEGRAM_TOKEN", "env-token")]))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_unreadable_path_fails() {
        // A directory exists but cannot be read as a file
        let dir = tempfile::tempdir().unwrap();

        let err = Config::load_with_env(dir.path(), env(&[("TELEGRAM_TOKEN", "env-token")]))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }

    #[test]
    fn test_load_file_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [telegram]
            bot_token = "from-file"
            allowed_user_ids = [7]

            [lyrics]
            genius_token = "file-genius"
            "#
        )
        .unwrap();

        let config =
            Config::load_with_env(file.path(), env(&[("GENIUS_TOKEN", "env-genius")])).unwrap();
        assert_eq!(config.telegram.bot_token, "from-file");
        assert!(config.is_user_allowed(7));
        assert_eq!(config.lyrics.genius_token(), Some("env-genius"));
    }

    #[test]
    fn test_empty_allow_list_admits_everyone() {
        assert!(Config::default().is_user_allowed(42));
    }
}
