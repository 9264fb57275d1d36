use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use shared::{
    summarizer, Config, ContentExtractor, DigestPipeline, DigestRenderer, EmailSender,
    HttpFeedFetcher, SentStore, SummarizerBackend,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daily-digest")]
#[command(about = "Collect new articles from news feeds, summarize them and email a daily digest")]
struct Args {
    /// Print the digest instead of emailing it. Nothing is recorded as sent, so a later
    /// run still delivers the same articles.
    #[arg(long)]
    dry_run: bool,

    /// JSON file listing categories and their feeds
    #[arg(short, long)]
    feeds: Option<PathBuf>,

    /// Path to the sent-articles database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Maximum number of articles per category
    #[arg(short, long)]
    max_per_category: Option<usize>,

    /// Use the offline extractive summarizer instead of the inference API
    #[arg(long)]
    local: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;

    if let Some(path) = &args.feeds {
        config.load_feeds_file(path)?;
    }
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(max) = args.max_per_category {
        config.pipeline.max_per_category = max;
    }
    if args.local {
        config.summarizer.backend = SummarizerBackend::Local;
    }

    println!(
        "📚 {} categories, up to {} articles each",
        config.pipeline.categories.len(),
        config.pipeline.max_per_category
    );

    let sender = if args.dry_run {
        None
    } else {
        Some(EmailSender::new(config.smtp.clone()).context("Email delivery is not configured")?)
    };

    let store = SentStore::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open sent-articles database at {}",
            config.database_path.display()
        )
    })?;
    println!(
        "✓ {} articles already delivered",
        store.count().context("Failed to read sent-articles database")?
    );

    let fetcher = HttpFeedFetcher::new(config.feed_timeout).context("Failed to create feed client")?;
    let extractor = ContentExtractor::new().context("Failed to create article client")?;
    let summarizer =
        summarizer::from_config(&config.summarizer).context("Failed to create summarizer")?;

    println!("\n🌐 Collecting and summarizing articles ({} summarizer)...", summarizer.name());
    println!("  (This may take a few minutes...)");

    let pipeline = DigestPipeline::new(
        &config.pipeline,
        &store,
        &fetcher,
        &extractor,
        summarizer.as_ref(),
    )
    .dry_run(args.dry_run);
    let digest = pipeline
        .run()
        .await
        .context("Aborted: the sent-articles database failed, no digest was sent")?;

    for category in &digest.categories {
        println!("  {} — {} new", category.name, category.items.len());
    }
    println!("✓ Collected {} new articles", digest.total_items());

    let today = Local::now().date_naive();
    let subject = DigestRenderer::subject(today);
    let body = DigestRenderer::body(&digest, today);

    let Some(sender) = sender else {
        println!("\n📝 Subject: {}\n", subject);
        println!("{}", body);
        println!("\n(dry run: nothing sent, nothing recorded)");
        return Ok(());
    };

    println!("\n✉️  Sending digest...");
    sender
        .send(&subject, &body)
        .await
        .context("Failed to send digest email")?;

    println!("\n✅ Digest sent.");

    Ok(())
}
