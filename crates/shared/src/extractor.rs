use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::ExtractError;
use crate::models::ExtractedArticle;

#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedArticle, ExtractError>;
}

pub struct ContentExtractor {
    client: Client,
}

impl ContentExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; NewsDigest/1.0)")
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Pull the headline and body text out of an HTML page.
    pub fn parse_html(html: &str) -> ExtractedArticle {
        let document = Html::parse_document(html);

        let title = Self::first_attr(&document, "meta[property=\"og:title\"]", "content")
            .or_else(|| Self::first_text(&document, "title"))
            .or_else(|| Self::first_text(&document, "h1"))
            .unwrap_or_default();

        let mut text = Self::paragraphs(&document, "article p");
        if text.is_empty() {
            text = Self::paragraphs(&document, "p");
        }
        if text.is_empty() {
            text = html2text::from_read(html.as_bytes(), 100).trim().to_string();
        }

        ExtractedArticle { title, text }
    }

    fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    fn first_text(document: &Html, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .map(|el| Self::normalize(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    }

    fn paragraphs(document: &Html, selector: &str) -> String {
        let Ok(selector) = Selector::parse(selector) else {
            return String::new();
        };
        document
            .select(&selector)
            .map(|el| Self::normalize(&el.text().collect::<String>()))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl ArticleExtractor for ContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedArticle, ExtractError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == 401 || status == 403 || status == 404 {
            tracing::debug!(url, status = status.as_u16(), "article not accessible");
            return Ok(ExtractedArticle::empty());
        }

        if !status.is_success() {
            return Err(ExtractError::Status {
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        Ok(Self::parse_html(&html))
    }
}
