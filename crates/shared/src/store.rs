use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

use crate::error::StoreError;
use crate::models::SentRecord;

/// Durable record of article URLs that have already been delivered.
///
/// Records are only ever inserted. A second insert for the same URL is ignored, so the
/// original send time is kept.
pub struct SentStore {
    conn: Connection,
}

impl SentStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sent_articles (
                id INTEGER PRIMARY KEY,
                url TEXT UNIQUE NOT NULL,
                title TEXT,
                date_sent TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn is_sent(&self, url: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sent_articles WHERE url = ?1 LIMIT 1",
                [url],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn mark_sent(&self, url: &str, title: &str) -> Result<(), StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO sent_articles (url, title, date_sent) VALUES (?1, ?2, ?3)",
            params![url, title, Utc::now().to_rfc3339()],
        )?;
        if inserted == 0 {
            tracing::debug!(url, "already recorded as sent");
        }
        Ok(())
    }

    pub fn record(&self, url: &str) -> Result<Option<SentRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT url, COALESCE(title, ''), date_sent FROM sent_articles WHERE url = ?1",
                [url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((url, title, date_sent)) = row else {
            return Ok(None);
        };

        let sent_at = parse_timestamp(&date_sent).ok_or_else(|| StoreError::Timestamp {
            url: url.clone(),
            value: date_sent.clone(),
        })?;

        Ok(Some(SentRecord {
            url,
            title,
            sent_at,
        }))
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sent_articles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// RFC 3339, or a naive ISO 8601 timestamp (read as UTC) as found in older databases.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
