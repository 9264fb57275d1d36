use chrono::NaiveDate;

use crate::models::Digest;

pub struct DigestRenderer;

impl DigestRenderer {
    pub fn subject(date: NaiveDate) -> String {
        format!("Daily Digest — {}", date.format("%Y-%m-%d"))
    }

    /// Plain-text email body, grouped by category in digest order.
    pub fn body(digest: &Digest, date: NaiveDate) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Daily News Digest — {}\n", date.format("%Y-%m-%d")));

        for category in &digest.categories {
            lines.push(format!(
                "--- {} ({} items) ---\n",
                category.name,
                category.items.len()
            ));
            for item in &category.items {
                lines.push(format!("{}\n{}\nLink: {}\n", item.title, item.summary, item.url));
            }
            lines.push("\n".to_string());
        }

        lines.push("\nEnd of digest.".to_string());
        lines.join("\n")
    }
}
