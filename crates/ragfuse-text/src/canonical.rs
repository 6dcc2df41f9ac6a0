use std::path::PathBuf;

use async_trait::async_trait;
use ragfuse_core::config::Settings;
use ragfuse_core::{CollectContext, Collector, Result, SearchResult};

pub const SOURCE: &str = "canonical";

const STOP_WORDS: [&str; 4] = ["the", "and", "for", "is"];

/// Lower-cased query tokens of at least two characters, stop words removed.
pub fn keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Keyword scan over the curated reference document.
///
/// Table rows (a `|` and no link) score 1.0, section headers 0.9; other
/// matching lines are not reported.
pub struct CanonicalCollector {
    path: PathBuf,
    limit: usize,
}

impl CanonicalCollector {
    pub fn new(path: PathBuf, limit: usize) -> Self {
        Self { path, limit }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.paths.canonical_path(), settings.collectors.canonical_limit)
    }

    pub fn scan(text: &str, keywords: &[String], limit: usize) -> Vec<SearchResult> {
        let mut results = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if results.len() >= limit {
                break;
            }
            let lower = line.to_lowercase();
            if !keywords.iter().any(|k| lower.contains(k.as_str())) {
                continue;
            }
            let line_num = idx + 1;
            if line.contains('|') && !line.contains("http") {
                results.push(SearchResult::new(format!("Canonical:L{line_num}"), line.trim(), SOURCE, 1.0));
            } else if line.contains("##") {
                results.push(SearchResult::new(format!("Canonical:Header:L{line_num}"), line.trim(), SOURCE, 0.9));
            }
        }
        results
    }
}

#[async_trait]
impl Collector for CanonicalCollector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn try_collect(&self, ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        let keywords = keywords(&ctx.query);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "canonical document absent");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::scan(&text, &keywords, self.limit))
    }
}
