use std::collections::HashSet;

use crate::config::{CategoryFeeds, PipelineConfig};
use crate::error::StoreError;
use crate::extractor::ArticleExtractor;
use crate::feed::{FeedEntries, FeedSource};
use crate::models::{CategoryDigest, Digest, DigestItem, ExtractedArticle, FeedEntry};
use crate::store::SentStore;
use crate::summarizer::{Summarizer, Summary};
use crate::text::shorten;

/// Width of the truncated article text used when no summary is available.
pub const FALLBACK_SUMMARY_WIDTH: usize = 300;

pub const UNTITLED: &str = "(no title)";

/// Turns feed entries into digest items, one at a time.
///
/// Every item is recorded in the [`SentStore`] the moment it is accepted, so an
/// interrupted run never re-delivers what it already committed. Feed, extraction and
/// summarization problems only degrade the output; a store failure aborts the run.
///
/// In dry-run mode the store is only read: items are selected as usual but nothing is
/// recorded, so a later real run offers them again.
pub struct DigestPipeline<'a> {
    config: &'a PipelineConfig,
    store: &'a SentStore,
    feeds: &'a dyn FeedSource,
    extractor: &'a dyn ArticleExtractor,
    summarizer: &'a dyn Summarizer,
    dry_run: bool,
}

impl<'a> DigestPipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        store: &'a SentStore,
        feeds: &'a dyn FeedSource,
        extractor: &'a dyn ArticleExtractor,
        summarizer: &'a dyn Summarizer,
    ) -> Self {
        Self {
            config,
            store,
            feeds,
            extractor,
            summarizer,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> Result<Digest, StoreError> {
        let mut digest = Digest::with_categories(
            self.config.categories.iter().map(|c| c.name.clone()),
        );

        // URLs emitted by this run; the only guard against repeats when nothing is recorded
        let mut emitted = HashSet::new();

        for (category, slot) in self.config.categories.iter().zip(digest.categories.iter_mut()) {
            self.collect_category(category, slot, &mut emitted).await?;
        }

        tracing::info!(items = digest.total_items(), dry_run = self.dry_run, "digest collected");
        Ok(digest)
    }

    #[tracing::instrument(name = "category", skip_all, fields(name = %category.name))]
    async fn collect_category(
        &self,
        category: &CategoryFeeds,
        slot: &mut CategoryDigest,
        emitted: &mut HashSet<String>,
    ) -> Result<(), StoreError> {
        let cap = self.config.cap_for(category);

        for feed_url in &category.feeds {
            if slot.items.len() >= cap {
                break;
            }

            tracing::info!(feed = %feed_url, "fetching feed");
            let entries = match self.feeds.fetch(feed_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "feed fetch failed");
                    continue;
                }
            };

            self.collect_entries(entries, cap, slot, emitted).await?;
        }

        tracing::info!(items = slot.items.len(), cap, "category done");
        Ok(())
    }

    async fn collect_entries(
        &self,
        entries: FeedEntries,
        cap: usize,
        slot: &mut CategoryDigest,
        emitted: &mut HashSet<String>,
    ) -> Result<(), StoreError> {
        for entry in entries {
            if slot.items.len() >= cap {
                break;
            }

            let Some(url) = entry.candidate_url() else {
                tracing::debug!(title = ?entry.title, "entry has no URL, skipping");
                continue;
            };

            if emitted.contains(url) || self.store.is_sent(url)? {
                tracing::debug!(url, "already sent, skipping");
                continue;
            }

            let item = self.build_item(url, &entry).await;
            if !self.dry_run {
                self.store.mark_sent(&item.url, &item.title)?;
            }
            emitted.insert(item.url.clone());
            tracing::info!(url = %item.url, "added to digest");
            slot.items.push(item);

            tokio::time::sleep(self.config.politeness_delay).await;
        }

        Ok(())
    }

    async fn build_item(&self, url: &str, entry: &FeedEntry) -> DigestItem {
        let article = match self.extractor.extract(url).await {
            Ok(article) => article,
            Err(e) => {
                tracing::warn!(url, error = %e, "extraction failed");
                ExtractedArticle::empty()
            }
        };

        let text = if article.text.trim().is_empty() {
            entry.inline_summary.clone().unwrap_or_default()
        } else {
            article.text
        };

        let summary = match self.summarizer.summarize(&text).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(url, summarizer = self.summarizer.name(), error = %e, "summarizer error");
                Summary::Unavailable
            }
        };

        let summary = match summary.usable_text() {
            Some(summary) => summary.to_string(),
            None => shorten(&text, FALLBACK_SUMMARY_WIDTH),
        };

        let title = [Some(article.title.as_str()), entry.title.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        DigestItem {
            url: url.to_string(),
            title,
            summary,
        }
    }
}
