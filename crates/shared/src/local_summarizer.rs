use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::SummarizeError;
use crate::summarizer::{Summarizer, Summary};
use crate::text::shorten;

const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "been", "being", "could", "from", "have", "into", "more", "said",
    "such", "than", "that", "their", "them", "then", "there", "these", "they", "this", "those",
    "were", "what", "when", "where", "which", "while", "will", "with", "would", "your",
];

/// Offline extractive summarizer.
///
/// Picks the sentences whose words occur most often across the whole text and keeps
/// them in their original order. Needs no network access and never fails.
pub struct LocalSummarizer {
    max_sentences: usize,
    max_chars: usize,
}

impl Default for LocalSummarizer {
    fn default() -> Self {
        Self {
            max_sentences: 3,
            max_chars: 600,
        }
    }
}

impl LocalSummarizer {
    pub fn new(max_sentences: usize, max_chars: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
            max_chars,
        }
    }

    pub fn summarize_text(&self, text: &str) -> String {
        let sentences = split_sentences(text);
        if sentences.len() <= self.max_sentences {
            return shorten(text, self.max_chars);
        }

        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for sentence in &sentences {
            for word in keywords(sentence) {
                *frequencies.entry(word).or_default() += 1;
            }
        }
        let top = frequencies.values().copied().max().unwrap_or(1) as f64;

        let mut scored: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| {
                let words = keywords(sentence);
                let score = if words.is_empty() {
                    0.0
                } else {
                    let total: usize = words.iter().map(|w| frequencies[w]).sum();
                    total as f64 / top / words.len() as f64
                };
                (index, score)
            })
            .collect();

        // Highest score first; earlier sentences win ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut chosen: Vec<usize> = scored
            .into_iter()
            .take(self.max_sentences)
            .map(|(index, _)| index)
            .collect();
        chosen.sort_unstable();

        let summary = chosen
            .into_iter()
            .map(|index| sentences[index])
            .collect::<Vec<_>>()
            .join(" ");
        shorten(&summary, self.max_chars)
    }
}

#[async_trait]
impl Summarizer for LocalSummarizer {
    async fn summarize(&self, text: &str) -> Result<Summary, SummarizeError> {
        if text.trim().is_empty() {
            return Ok(Summary::Success(String::new()));
        }
        Ok(Summary::Success(self.summarize_text(text)))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Split on `.`, `!` or `?` followed by whitespace or the end of the text.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if at_boundary {
            let end = index + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn keywords(sentence: &str) -> Vec<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}
