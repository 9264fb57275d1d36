use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

use crate::error::FetchError;
use crate::models::FeedEntry;

/// Something that can list the current entries of a feed endpoint.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FeedEntries, FetchError>;
}

/// Entries of one fetched feed, converted to [`FeedEntry`] as they are pulled.
pub struct FeedEntries {
    inner: Box<dyn Iterator<Item = FeedEntry> + Send>,
}

impl FeedEntries {
    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    pub fn from_entries(entries: Vec<FeedEntry>) -> Self {
        Self {
            inner: Box::new(entries.into_iter()),
        }
    }

    /// Parse a feed document as RSS, falling back to Atom.
    pub fn parse(content: &[u8]) -> Result<Self, FetchError> {
        let rss_err = match rss::Channel::read_from(content) {
            Ok(channel) => {
                tracing::debug!(items = channel.items.len(), "parsed RSS feed");
                return Ok(Self {
                    inner: Box::new(channel.items.into_iter().map(from_rss_item)),
                });
            }
            Err(e) => e.to_string(),
        };

        match atom_syndication::Feed::read_from(content) {
            Ok(feed) => {
                tracing::debug!(entries = feed.entries.len(), "parsed Atom feed");
                Ok(Self {
                    inner: Box::new(feed.entries.into_iter().map(from_atom_entry)),
                })
            }
            Err(atom_err) => Err(FetchError::Parse {
                rss: rss_err,
                atom: atom_err.to_string(),
            }),
        }
    }
}

impl Iterator for FeedEntries {
    type Item = FeedEntry;

    fn next(&mut self) -> Option<FeedEntry> {
        self.inner.next()
    }
}

fn from_rss_item(item: rss::Item) -> FeedEntry {
    let inline_summary = item
        .description()
        .or_else(|| item.content())
        .and_then(html_to_text);

    FeedEntry {
        link: item.link().map(str::to_string),
        id: item.guid().map(|g| g.value().to_string()),
        href: item.enclosure().map(|e| e.url().to_string()),
        title: item.title().map(str::to_string),
        inline_summary,
    }
}

fn from_atom_entry(entry: atom_syndication::Entry) -> FeedEntry {
    let link = entry
        .links()
        .iter()
        .find(|link| link.rel() == "alternate")
        .map(|link| link.href().to_string());
    let href = entry.links().first().map(|link| link.href().to_string());

    let inline_summary = entry
        .summary()
        .map(|s| s.as_str().to_string())
        .or_else(|| entry.content().and_then(|c| c.value().map(str::to_string)))
        .and_then(|s| html_to_text(&s));

    let title = entry.title().as_str().trim();

    FeedEntry {
        link,
        id: Some(entry.id().to_string()).filter(|id| !id.is_empty()),
        href,
        title: (!title.is_empty()).then(|| title.to_string()),
        inline_summary,
    }
}

/// Feed descriptions are usually HTML fragments.
fn html_to_text(html: &str) -> Option<String> {
    let text = html2text::from_read(html.as_bytes(), 10_000);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Fetches feeds over HTTP.
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; NewsDigest/1.0)")
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedEntries, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.contains("xml") {
            tracing::warn!(url, content_type = %content_type, "skipping non-XML feed");
            return Ok(FeedEntries::empty());
        }

        let body = response.bytes().await?;
        FeedEntries::parse(&body)
    }
}
