use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the default directory for the digest's local data
pub fn get_default_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join("news-digest");

    Ok(data_dir)
}

/// Where the sent-articles database lives unless `DIGEST_DB_PATH` says otherwise.
/// The directory is created when the store is opened.
pub fn default_database_path() -> Result<PathBuf> {
    Ok(get_default_data_dir()?.join("news_digest.db"))
}
