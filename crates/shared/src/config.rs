use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::io::default_database_path;
use crate::retry::RetryPolicy;

pub const DEFAULT_MAX_PER_CATEGORY: usize = 5;
pub const DEFAULT_SUMMARIZER_MODEL: &str = "sshleifer/distilbart-cnn-12-6";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// The feeds that make up one digest section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryFeeds {
    pub name: String,
    pub feeds: Vec<String>,
    /// Overrides the global per-category cap.
    #[serde(default)]
    pub max_items: Option<usize>,
}

impl CategoryFeeds {
    pub fn new(name: impl Into<String>, feeds: &[&str]) -> Self {
        Self {
            name: name.into(),
            feeds: feeds.iter().map(|f| f.to_string()).collect(),
            max_items: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub categories: Vec<CategoryFeeds>,
    pub max_per_category: usize,
    /// Pause after every article that makes it into the digest.
    pub politeness_delay: Duration,
}

impl PipelineConfig {
    pub fn cap_for(&self, category: &CategoryFeeds) -> usize {
        category.max_items.unwrap_or(self.max_per_category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerBackend {
    Remote,
    Local,
}

impl FromStr for SummarizerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "api" | "hf" => Ok(SummarizerBackend::Remote),
            "local" => Ok(SummarizerBackend::Local),
            other => anyhow::bail!("Unknown summarizer backend '{}'. Use 'remote' or 'local'.", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub backend: SummarizerBackend,
    pub api_url: String,
    pub api_token: Option<String>,
    /// Inputs longer than this many characters are summarized in chunks.
    pub chunk_chars: usize,
    pub max_new_tokens: u32,
    pub min_length: u32,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: Option<String>,
    pub to_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub summarizer: SummarizerConfig,
    pub smtp: SmtpConfig,
    pub database_path: PathBuf,
    pub feed_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let categories = match lookup("DIGEST_FEEDS_FILE") {
            Some(path) => load_categories(Path::new(&path))?,
            None => default_categories(),
        };
        validate_categories(&categories)?;

        let pipeline = PipelineConfig {
            categories,
            max_per_category: parse_or(&lookup, "DIGEST_MAX_PER_CATEGORY", DEFAULT_MAX_PER_CATEGORY)?,
            politeness_delay: Duration::from_millis(parse_or(&lookup, "DIGEST_POLITENESS_MS", 1000)?),
        };

        let model = lookup("HF_SUMMARIZER_MODEL").unwrap_or_else(|| DEFAULT_SUMMARIZER_MODEL.to_string());
        let api_url = lookup("SUMMARIZER_API_URL")
            .unwrap_or_else(|| format!("https://router.huggingface.co/hf-inference/models/{}", model));

        let backend = match lookup("SUMMARIZER_BACKEND") {
            Some(value) => value
                .parse::<SummarizerBackend>()
                .context("Invalid SUMMARIZER_BACKEND")?,
            None => SummarizerBackend::Remote,
        };

        let summarizer = SummarizerConfig {
            backend,
            api_url,
            api_token: lookup("HF_API_TOKEN"),
            chunk_chars: parse_or(&lookup, "SUMMARIZER_CHUNK_CHARS", 3000)?,
            max_new_tokens: parse_or(&lookup, "SUMMARY_MAX_TOKENS", 120)?,
            min_length: parse_or(&lookup, "SUMMARY_MIN_LENGTH", 30)?,
            retry: RetryPolicy::new(
                parse_or(&lookup, "SUMMARIZER_MAX_ATTEMPTS", 3)?,
                Duration::from_secs(parse_or(&lookup, "SUMMARIZER_BACKOFF_SECS", 5)?),
            ),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        };

        let username = lookup("SMTP_USER");
        let from_email = lookup("EMAIL_FROM").or_else(|| username.clone());
        let to_email = lookup("EMAIL_TO").or_else(|| from_email.clone());

        let smtp = SmtpConfig {
            host: lookup("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
            username,
            password: lookup("SMTP_PASS"),
            from_email,
            to_email,
        };

        let database_path = match lookup("DIGEST_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        Ok(Self {
            pipeline,
            summarizer,
            smtp,
            database_path,
            feed_timeout: Duration::from_secs(parse_or(&lookup, "DIGEST_FEED_TIMEOUT_SECS", 15)?),
        })
    }

    /// Replace the configured categories with the ones listed in a feeds file.
    pub fn load_feeds_file(&mut self, path: &Path) -> Result<()> {
        let categories = load_categories(path)?;
        validate_categories(&categories)?;
        self.pipeline.categories = categories;
        Ok(())
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/news-digest/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("news-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

/// Load categories from a JSON file: `[{"name": "IT", "feeds": ["https://..."]}]`.
pub fn load_categories(path: &Path) -> Result<Vec<CategoryFeeds>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feeds file: {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse feeds file {}. Expected a JSON list of {{\"name\", \"feeds\"}} objects.",
            path.display()
        )
    })
}

fn validate_categories(categories: &[CategoryFeeds]) -> Result<()> {
    if categories.is_empty() {
        anyhow::bail!("No feed categories configured");
    }

    for category in categories {
        if category.name.trim().is_empty() {
            anyhow::bail!("Feed category with an empty name");
        }
        for feed in &category.feeds {
            url::Url::parse(feed)
                .with_context(|| format!("Invalid feed URL in {}: {}", category.name, feed))?;
        }
    }

    let mut names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
        anyhow::bail!("Feed category '{}' is listed twice", pair[0]);
    }

    Ok(())
}

pub fn default_categories() -> Vec<CategoryFeeds> {
    vec![
        CategoryFeeds::new(
            "IT",
            &[
                "https://techcrunch.com/feed/",
                "https://news.ycombinator.com/rss",
                "https://www.wired.com/feed/rss.xml",
                "https://www.computerweekly.com/rss",
                "https://www.techrepublic.com/rssfeeds/",
                "https://www.gadgets360.com/rss",
            ],
        ),
        CategoryFeeds::new(
            "Finance",
            &[
                "https://www.nasdaq.com/feed/rssoutbound?category=Top-News",
                "https://www.nasdaq.com/feed/rssoutbound?category=Market-Headlines",
                "https://www.investing.com/rss/stock_stock_picks.rss",
                "https://www.nasdaq.com/feed/rssoutbound?category=Market-News",
            ],
        ),
        CategoryFeeds::new(
            "Cryptocurrency",
            &["https://www.nasdaq.com/feed/rssoutbound?category=Cryptocurrencies"],
        ),
        CategoryFeeds::new("Global-Politics", &["https://www.crisisgroup.org/rss"]),
        CategoryFeeds::new("Moroccan-Politics", &["https://www.crisisgroup.org/rss/133"]),
        CategoryFeeds::new("French-Politics", &["https://www.crisisgroup.org/rss/169"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("DIGEST_DB_PATH", "/tmp/digest.db")])).unwrap();

        let names: Vec<_> = config
            .pipeline
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "IT",
                "Finance",
                "Cryptocurrency",
                "Global-Politics",
                "Moroccan-Politics",
                "French-Politics"
            ]
        );
        assert_eq!(config.pipeline.max_per_category, 5);
        assert_eq!(config.pipeline.politeness_delay, Duration::from_secs(1));
        assert_eq!(config.summarizer.backend, SummarizerBackend::Remote);
        assert_eq!(
            config.summarizer.api_url,
            "https://router.huggingface.co/hf-inference/models/sshleifer/distilbart-cnn-12-6"
        );
        assert_eq!(config.summarizer.chunk_chars, 3000);
        assert_eq!(config.summarizer.retry, RetryPolicy::new(3, Duration::from_secs(5)));
        assert_eq!(config.smtp.port, 587);
        assert!(config.smtp.from_email.is_none());
        assert_eq!(config.database_path, PathBuf::from("/tmp/digest.db"));
    }

    #[test]
    fn test_email_addresses_fall_back_to_smtp_user() {
        let config = Config::from_lookup(lookup_from(&[
            ("DIGEST_DB_PATH", "/tmp/digest.db"),
            ("SMTP_USER", "me@example.com"),
        ]))
        .unwrap();
        assert_eq!(config.smtp.from_email.as_deref(), Some("me@example.com"));
        assert_eq!(config.smtp.to_email.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("DIGEST_DB_PATH", "/tmp/digest.db"),
            ("DIGEST_MAX_PER_CATEGORY", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DIGEST_MAX_PER_CATEGORY"));
    }

    #[test]
    fn test_local_backend() {
        let config = Config::from_lookup(lookup_from(&[
            ("DIGEST_DB_PATH", "/tmp/digest.db"),
            ("SUMMARIZER_BACKEND", "Local"),
        ]))
        .unwrap();
        assert_eq!(config.summarizer.backend, SummarizerBackend::Local);
        assert!("gpt".parse::<SummarizerBackend>().is_err());
    }

    #[test]
    fn test_feeds_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"name": "IT", "feeds": ["https://example.com/rss"]}},
                {{"name": "Finance", "feeds": ["https://example.com/fin"], "max_items": 2}}
            ]"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = Config::from_lookup(lookup_from(&[
            ("DIGEST_DB_PATH", "/tmp/digest.db"),
            ("DIGEST_FEEDS_FILE", path.as_str()),
        ]))
        .unwrap();

        let categories = &config.pipeline.categories;
        assert_eq!(categories.len(), 2);
        assert_eq!(config.pipeline.cap_for(&categories[0]), 5);
        assert_eq!(config.pipeline.cap_for(&categories[1]), 2);
    }

    #[test]
    fn test_rejects_bad_feed_url_and_duplicates() {
        assert!(validate_categories(&[CategoryFeeds::new("IT", &["not a url"])]).is_err());
        assert!(validate_categories(&[
            CategoryFeeds::new("IT", &["https://a.com/rss"]),
            CategoryFeeds::new("IT", &["https://b.com/rss"]),
        ])
        .is_err());
        assert!(validate_categories(&[]).is_err());
    }
}
