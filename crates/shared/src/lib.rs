// Public modules
pub mod config;
pub mod email;
pub mod error;
pub mod extractor;
pub mod feed;
pub mod io;
pub mod local_summarizer;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod retry;
pub mod store;
pub mod summarizer;
pub mod text;

// Re-export commonly used types
pub use config::{CategoryFeeds, Config, PipelineConfig, SummarizerBackend, SummarizerConfig};
pub use email::EmailSender;
pub use error::{CallError, ExtractError, FetchError, StoreError, SummarizeError};
pub use extractor::{ArticleExtractor, ContentExtractor};
pub use feed::{FeedEntries, FeedSource, HttpFeedFetcher};
pub use local_summarizer::LocalSummarizer;
pub use models::{CategoryDigest, Digest, DigestItem, ExtractedArticle, FeedEntry, SentRecord};
pub use pipeline::DigestPipeline;
pub use render::DigestRenderer;
pub use retry::RetryPolicy;
pub use store::SentStore;
pub use summarizer::{RemoteSummarizer, Summarizer, Summary};
