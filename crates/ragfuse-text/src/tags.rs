use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use ragfuse_core::config::Settings;
use ragfuse_core::task::with_deadline;
use ragfuse_core::{CollectContext, Collector, Error, Result, SearchResult};

pub const SOURCE: &str = "tags";

/// Case-insensitive substring search over the sharded tag index.
///
/// Shards are searched in order; when none exists the legacy single-file
/// index is used instead. Scores restart at 1.0 in every file and drop by
/// 0.05 per matching line.
pub struct TagCollector {
    shards: Vec<PathBuf>,
    legacy: PathBuf,
    max_per_file: usize,
    timeout: Duration,
}

impl TagCollector {
    pub fn new(shards: Vec<PathBuf>, legacy: PathBuf, max_per_file: usize, timeout: Duration) -> Self {
        Self { shards, legacy, max_per_file, timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.paths.tag_shard_paths(),
            settings.paths.tag_legacy_path(),
            settings.collectors.tags_max_per_file,
            Duration::from_millis(settings.collectors.tags_timeout_ms),
        )
    }

    async fn index_paths(&self) -> Vec<PathBuf> {
        let mut present = Vec::new();
        for shard in &self.shards {
            if exists(shard).await {
                present.push(shard.clone());
            }
        }
        if present.is_empty() && exists(&self.legacy).await {
            present.push(self.legacy.clone());
        }
        present
    }

    pub fn match_lines(text: &str, query: &str, max: usize) -> Vec<SearchResult> {
        let needle = query.to_lowercase();
        text.lines()
            .filter(|line| !line.trim().is_empty() && line.to_lowercase().contains(&needle))
            .take(max)
            .enumerate()
            .map(|(i, line)| {
                #[allow(clippy::cast_precision_loss)]
                let score = 1.0 - (i as f64 * 0.05);
                SearchResult::new(format!("Tag:{}", tag_key(line, query)), line.trim(), SOURCE, score)
            })
            .collect()
    }
}

/// First non-empty table cell of an index line, or the query itself.
fn tag_key<'a>(line: &'a str, query: &'a str) -> &'a str {
    if !line.contains('|') {
        return query;
    }
    line.split('|').map(str::trim).find(|cell| !cell.is_empty()).unwrap_or(query)
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[async_trait]
impl Collector for TagCollector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn try_collect(&self, ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        let query = ctx.query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        with_deadline(SOURCE, self.timeout, &ctx.cancel, async {
            let mut results = Vec::new();
            for path in self.index_paths().await {
                let text = tokio::fs::read_to_string(&path).await?;
                results.extend(Self::match_lines(&text, query, self.max_per_file));
            }
            Ok::<_, Error>(results)
        })
        .await
    }
}
