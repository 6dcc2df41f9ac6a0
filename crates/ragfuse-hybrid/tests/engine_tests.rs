use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use ragfuse_core::config::Settings;
use ragfuse_core::task::CancellationToken;
use ragfuse_core::{CollectContext, Collector, Embedder, Error, Reranker, Result, SearchOptions, SearchResult};
use ragfuse_embed::HashEmbedder;
use ragfuse_hybrid::{HybridSearchEngine, ResultOrigin};

/// Returns the same list every time and counts calls.
struct FixedCollector {
    source: &'static str,
    results: Vec<SearchResult>,
    calls: AtomicUsize,
}

impl FixedCollector {
    fn new(source: &'static str, items: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            source,
            results: items.iter().map(|(id, raw)| SearchResult::new(*id, format!("{id} text"), source, *raw)).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collector for FixedCollector {
    fn source(&self) -> &str {
        self.source
    }

    async fn try_collect(&self, _ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.clone())
    }
}

struct FailingCollector;

#[async_trait]
impl Collector for FailingCollector {
    fn source(&self) -> &str {
        "sqlite"
    }

    async fn try_collect(&self, _ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        Err(Error::backend("sqlite", "database is locked"))
    }
}

/// Ignores cancellation on purpose so only the engine deadline can stop it.
struct HangingCollector;

#[async_trait]
impl Collector for HangingCollector {
    fn source(&self) -> &str {
        "graphrag"
    }

    async fn try_collect(&self, _ctx: &CollectContext) -> Result<Vec<SearchResult>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![SearchResult::new("late", "", "graphrag", 1.0)])
    }
}

/// Blocks well past any test deadline before producing a vector.
struct SlowEmbedder;

impl Embedder for SlowEmbedder {
    fn dim(&self) -> usize {
        4
    }

    fn max_len(&self) -> usize {
        512
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        std::thread::sleep(Duration::from_millis(1_500));
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
    }
}

struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _query: &str, _candidates: &[SearchResult], _top_k: usize) -> Result<Vec<SearchResult>> {
        Err(Error::backend("reranker", "connection refused"))
    }
}

/// Scores candidates in reverse of their fused order.
struct ReversingReranker {
    seen: AtomicUsize,
}

#[async_trait]
impl Reranker for ReversingReranker {
    async fn rerank(&self, _query: &str, candidates: &[SearchResult], top_k: usize) -> Result<Vec<SearchResult>> {
        self.seen.store(candidates.len(), Ordering::SeqCst);
        #[allow(clippy::cast_precision_loss)]
        let mut out: Vec<SearchResult> = candidates
            .iter()
            .enumerate()
            .rev()
            .map(|(i, c)| {
                let mut r = c.clone();
                r.rerank_score = Some(i as f64 / 100.0);
                r
            })
            .collect();
        out.truncate(top_k);
        Ok(out)
    }
}

fn settings(deadline_ms: u64) -> Settings {
    let mut settings = Settings::default();
    settings.search.deadline_ms = deadline_ms;
    settings
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn second_identical_query_is_served_from_exact_cache() {
    let canonical = FixedCollector::new("canonical", &[("Canonical:L3", 1.0), ("Canonical:Header:L1", 0.9)]);
    let tags = FixedCollector::new("tags", &[("Tag:risk", 1.0), ("Canonical:L3", 0.95)]);
    let engine = HybridSearchEngine::new(&settings(8_000))
        .with_collector(canonical.clone())
        .with_collector(tags.clone());

    let first = engine.search("Risk  Limits", SearchOptions::default()).await;
    assert_eq!(first.origin, ResultOrigin::Fresh);
    assert_eq!(ids(&first.results)[0], "Canonical:L3");

    let second = engine.search("  risk limits", SearchOptions::default()).await;
    assert_eq!(second.origin, ResultOrigin::Exact);
    assert_eq!(second.results, first.results);
    assert_eq!(canonical.calls(), 1);
    assert_eq!(tags.calls(), 1);

    let strict = SearchOptions { strict: true, ..SearchOptions::default() };
    let third = engine.search("risk limits", strict).await;
    assert_eq!(third.origin, ResultOrigin::Fresh);
    assert_eq!(canonical.calls(), 2);
}

#[tokio::test]
async fn failing_and_hung_collectors_degrade_to_partial_results() {
    let tags = FixedCollector::new("tags", &[("Tag:kelly", 1.0)]);
    let engine = HybridSearchEngine::new(&settings(300))
        .with_collector(Arc::new(FailingCollector))
        .with_collector(Arc::new(HangingCollector))
        .with_collector(tags.clone());

    let started = Instant::now();
    let response = engine.search("kelly", SearchOptions::default()).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(ids(&response.results), vec!["Tag:kelly"]);
    assert_eq!(response.timed_out, vec!["graphrag".to_string()]);

    // incomplete rankings are not pinned in the cache
    let again = engine.search("kelly", SearchOptions::default()).await;
    assert_eq!(again.origin, ResultOrigin::Fresh);
    assert_eq!(tags.calls(), 2);
}

#[tokio::test]
async fn nothing_found_is_a_valid_empty_outcome() {
    let engine = HybridSearchEngine::new(&settings(1_000)).with_collector(FixedCollector::new("tags", &[]));
    let response = engine.search("nothing", SearchOptions { strict: true, ..SearchOptions::default() }).await;
    assert!(response.results.is_empty());
    assert_eq!(response.suppressed, 0);
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn strict_mode_counts_suppressed_over_full_ranking() {
    let strong = FixedCollector::new("canonical", &[("c1", 1.0), ("c2", 1.0)]);
    let weak = FixedCollector::new("filename", &[("f0", 0.1), ("f1", 0.1), ("f2", 0.1), ("f3", 0.1), ("f4", 0.1), ("f5", 0.1)]);
    let engine = HybridSearchEngine::new(&settings(8_000)).with_collector(strong).with_collector(weak);

    let options = SearchOptions { strict: true, limit: 1, ..SearchOptions::default() };
    let response = engine.search("q", options).await;
    assert_eq!(ids(&response.results), vec!["c1"]);
    assert_eq!(response.suppressed, 6);

    let cached = engine.search("q", options).await;
    assert_eq!(cached.origin, ResultOrigin::Exact);
    assert_eq!(cached.suppressed, 6);
}

#[tokio::test]
async fn paraphrase_hits_semantic_cache() {
    let tags = FixedCollector::new("tags", &[("Tag:stops", 1.0)]);
    let engine = HybridSearchEngine::new(&settings(8_000))
        .with_collector(tags.clone())
        .with_embedder(Arc::new(HashEmbedder::new(256)));

    let first = engine.search("stop loss rules", SearchOptions::default()).await;
    assert_eq!(first.origin, ResultOrigin::Fresh);

    let second = engine.search("loss rules stop", SearchOptions::default()).await;
    assert_eq!(second.origin, ResultOrigin::Semantic);
    assert_eq!(second.results, first.results);
    assert_eq!(tags.calls(), 1);
}

#[tokio::test]
async fn rerank_failure_keeps_fused_order() {
    let tags = FixedCollector::new("tags", &[("a", 1.0), ("b", 0.9), ("c", 0.8)]);
    let plain = HybridSearchEngine::new(&settings(8_000)).with_collector(tags.clone());
    let fused = plain.search("q", SearchOptions::default()).await;

    let failing = HybridSearchEngine::new(&settings(8_000))
        .with_collector(tags)
        .with_reranker(Arc::new(FailingReranker));
    let response = failing.search("q", SearchOptions { rerank: true, ..SearchOptions::default() }).await;
    assert_eq!(ids(&response.results), ids(&fused.results));
    assert!(!response.reranked);
}

#[tokio::test]
async fn reranker_reorders_top_candidates() {
    let items: Vec<(String, f64)> = (0..30).map(|i| (format!("d{i:02}"), 1.0)).collect();
    let borrowed: Vec<(&str, f64)> = items.iter().map(|(id, raw)| (id.as_str(), *raw)).collect();
    let reranker = Arc::new(ReversingReranker { seen: AtomicUsize::new(0) });
    let engine = HybridSearchEngine::new(&settings(8_000))
        .with_collector(FixedCollector::new("tags", &borrowed))
        .with_reranker(reranker.clone());

    let options = SearchOptions { rerank: true, limit: 3, ..SearchOptions::default() };
    let response = engine.search("q", options).await;
    assert_eq!(reranker.seen.load(Ordering::SeqCst), 25);
    assert!(response.reranked);
    assert_eq!(ids(&response.results), vec!["d24", "d23", "d22"]);
    assert_eq!(response.results[0].rerank_score, Some(0.24));
}

#[tokio::test]
async fn caller_cancellation_returns_promptly() {
    let engine = HybridSearchEngine::new(&settings(8_000)).with_collector(Arc::new(HangingCollector));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let started = Instant::now();
    let response = engine.search_with_cancel("q", SearchOptions::default(), cancel).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(response.results.is_empty());
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn embedding_and_collection_share_one_deadline() -> anyhow::Result<()> {
    let tags = FixedCollector::new("tags", &[("Tag:kelly", 1.0)]);
    let engine = HybridSearchEngine::new(&settings(500))
        .with_collector(tags)
        .with_collector(Arc::new(HangingCollector))
        .with_embedder(Arc::new(SlowEmbedder));

    let started = Instant::now();
    let response = engine.search("kelly", SearchOptions::default()).await;
    let elapsed = started.elapsed();
    anyhow::ensure!(elapsed < Duration::from_millis(900), "search took {elapsed:?} against a 500ms budget");
    assert!(response.timed_out.contains(&"graphrag".to_string()));
    assert!(engine.cache().is_empty());
    Ok(())
}
