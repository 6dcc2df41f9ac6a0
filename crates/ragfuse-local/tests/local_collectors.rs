use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tempfile::TempDir;

use ragfuse_core::{CollectContext, Collector};
use ragfuse_local::{FilenameCollector, SqliteCollector};

fn excluded() -> Vec<String> {
    vec![".git".to_string(), "node_modules".to_string()]
}

#[tokio::test]
async fn filenames_match_substring_and_skip_noise_dirs() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("docs/kelly_notes.md"), "x").unwrap();
    fs::write(root.join("node_modules/pkg/kelly.js"), "x").unwrap();
    fs::write(root.join("other.md"), "x").unwrap();

    let collector = FilenameCollector::new(root.to_path_buf(), excluded(), 5, Duration::from_secs(2));
    let hits = collector.collect(&CollectContext::new("kelly")).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "File: kelly_notes.md");
    assert_eq!(hits[0].content, format!("Path: {}", Path::new("docs").join("kelly_notes.md").display()));
    assert_eq!(hits[0].path(), Some(root.join("docs/kelly_notes.md").display().to_string().as_str()));
}

#[tokio::test]
async fn filenames_are_capped() {
    let tmp = TempDir::new().unwrap();
    for i in 0..9 {
        fs::write(tmp.path().join(format!("match_{i}.txt")), "x").unwrap();
    }
    let collector = FilenameCollector::new(tmp.path().to_path_buf(), excluded(), 5, Duration::from_secs(2));
    assert_eq!(collector.collect(&CollectContext::new("match")).await.len(), 5);
}

fn build_index(path: &Path, with_tags: bool) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE files (path TEXT PRIMARY KEY);").unwrap();
    conn.execute("INSERT INTO files (path) VALUES (?1)", ["/vault/kelly.md"]).unwrap();
    conn.execute("INSERT INTO files (path) VALUES (?1)", ["/vault/other.md"]).unwrap();
    if with_tags {
        conn.execute_batch(
            "CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE file_tags (file_path TEXT, tag_id INTEGER);
             INSERT INTO tags (id, name) VALUES (1, 'kelly-criterion');
             INSERT INTO file_tags (file_path, tag_id) VALUES ('/vault/other.md', 1);",
        )
        .unwrap();
    }
}

#[tokio::test]
async fn sqlite_reports_files_then_tags() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("index.db");
    build_index(&db, true);

    let collector = SqliteCollector::new(db, 10, Duration::from_secs(3));
    let hits = collector.collect(&CollectContext::new("kelly")).await;
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["Local:File:kelly.md", "Local:Tag:kelly-criterion:other.md"]);
    assert_eq!(hits[1].content, "Tag match: #kelly-criterion");
    assert!((hits[0].raw_score - 0.8).abs() < 1e-9);
    assert!((hits[1].raw_score - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn sqlite_without_tag_tables_keeps_file_matches() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("index.db");
    build_index(&db, false);

    let collector = SqliteCollector::new(db, 10, Duration::from_secs(3));
    let hits = collector.collect(&CollectContext::new("kelly")).await;
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn sqlite_missing_database_is_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let collector = SqliteCollector::new(tmp.path().join("absent.db"), 10, Duration::from_secs(3));
    let hits = collector.try_collect(&CollectContext::new("kelly")).await.expect("absent db is fine");
    assert!(hits.is_empty());
}
