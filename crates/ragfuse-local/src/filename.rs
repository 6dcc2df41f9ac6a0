use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use ragfuse_core::config::Settings;
use ragfuse_core::task::{run_blocking, CancellationToken};
use ragfuse_core::{CollectContext, Collector, Error, Result, SearchResult};
use walkdir::{DirEntry, WalkDir};

pub const SOURCE: &str = "filename";

/// Files under the project root whose name contains the query.
pub struct FilenameCollector {
    root: PathBuf,
    excluded: Vec<String>,
    limit: usize,
    timeout: Duration,
}

impl FilenameCollector {
    pub fn new(root: PathBuf, excluded: Vec<String>, limit: usize, timeout: Duration) -> Self {
        Self { root, excluded, limit, timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.paths.root(),
            settings.collectors.excluded_dirs.clone(),
            settings.collectors.filename_limit,
            Duration::from_millis(settings.collectors.filename_timeout_ms),
        )
    }
}

fn is_excluded(entry: &DirEntry, excluded: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && excluded.iter().any(|d| entry.file_name().to_str() == Some(d.as_str()))
}

fn find_files(
    root: &Path,
    query: &str,
    excluded: &[String],
    limit: usize,
    cancel: &CancellationToken,
) -> Result<Vec<SearchResult>> {
    let mut results = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e, excluded));
    for entry in walker {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(SOURCE.to_string()));
        }
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.contains(query) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        results.push(
            SearchResult::new(format!("File: {name}"), format!("Path: {}", relative.display()), SOURCE, 1.0)
                .with_meta("path", entry.path().display().to_string()),
        );
        if results.len() >= limit {
            break;
        }
    }
    Ok(results)
}

#[async_trait]
impl Collector for FilenameCollector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn try_collect(&self, ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        let query = ctx.query.trim().to_string();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let root = self.root.clone();
        let excluded = self.excluded.clone();
        let limit = self.limit;
        run_blocking(SOURCE, self.timeout, &ctx.cancel, move |token| {
            find_files(&root, &query, &excluded, limit, &token)
        })
        .await
    }
}
