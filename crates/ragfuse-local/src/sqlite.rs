use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use ragfuse_core::config::Settings;
use ragfuse_core::task::run_blocking;
use ragfuse_core::{CollectContext, Collector, Error, Result, SearchResult};
use rusqlite::{params, Connection, OpenFlags};

pub const SOURCE: &str = "sqlite";

const FILES_SQL: &str = "SELECT path FROM files WHERE path LIKE ?1 LIMIT ?2";
const TAGS_SQL: &str = "SELECT f.path, t.name
    FROM files f
    JOIN file_tags ft ON f.path = ft.file_path
    JOIN tags t ON ft.tag_id = t.id
    WHERE t.name LIKE ?1
    LIMIT ?2";

/// Filename and tag substring matches from the local SQLite index.
///
/// A missing database file is a normal state (nothing was indexed yet) and
/// yields no results.
pub struct SqliteCollector {
    db_path: PathBuf,
    limit: usize,
    timeout: Duration,
}

impl SqliteCollector {
    pub fn new(db_path: PathBuf, limit: usize, timeout: Duration) -> Self {
        Self { db_path, limit, timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.paths.sqlite_path(),
            settings.collectors.sqlite_limit,
            Duration::from_millis(settings.collectors.sqlite_timeout_ms),
        )
    }
}

fn sqlite_err(err: rusqlite::Error) -> Error {
    Error::backend(SOURCE, err)
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned())
}

fn query_index(db_path: &Path, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(sqlite_err)?;
    let pattern = format!("%{query}%");
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let mut results = Vec::new();
    let mut stmt = conn.prepare(FILES_SQL).map_err(sqlite_err)?;
    let paths = stmt
        .query_map(params![pattern, limit], |row| row.get::<_, String>(0))
        .map_err(sqlite_err)?;
    for path in paths {
        let path = path.map_err(sqlite_err)?;
        let name = file_name(&path);
        results.push(
            SearchResult::new(format!("Local:File:{name}"), format!("Local match: {name}"), SOURCE, 0.8)
                .with_meta("path", path),
        );
    }

    // Older indexes have no tag tables; keep the file matches in that case.
    match tag_matches(&conn, &pattern, limit) {
        Ok(tagged) => results.extend(tagged),
        Err(err) => tracing::warn!(error = %err, "sqlite tag lookup failed, keeping file matches"),
    }
    Ok(results)
}

fn tag_matches(conn: &Connection, pattern: &str, limit: i64) -> Result<Vec<SearchResult>> {
    let mut stmt = conn.prepare(TAGS_SQL).map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![pattern, limit], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(sqlite_err)?;
    let mut results = Vec::new();
    for row in rows {
        let (path, tag) = row.map_err(sqlite_err)?;
        let name = file_name(&path);
        results.push(
            SearchResult::new(format!("Local:Tag:{tag}:{name}"), format!("Tag match: #{tag}"), SOURCE, 0.9)
                .with_meta("path", path),
        );
    }
    Ok(results)
}

#[async_trait]
impl Collector for SqliteCollector {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn try_collect(&self, ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        if !tokio::fs::try_exists(&self.db_path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let db_path = self.db_path.clone();
        let query = ctx.query.trim().to_string();
        let limit = self.limit;
        run_blocking(SOURCE, self.timeout, &ctx.cancel, move |_| query_index(&db_path, &query, limit)).await
    }
}
