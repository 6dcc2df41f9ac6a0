use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use ragfuse_core::config::Settings;
use ragfuse_core::task::{run_blocking, CancellationToken};
use ragfuse_core::{CollectContext, Collector, Embedder, Error, Reranker, SearchOptions, SearchResult};

use crate::cache::{CacheKey, SearchCache};
use crate::confidence::ConfidenceThresholds;
use crate::fusion::{fuse, group_by_source, FusionWeights};

/// Where the ranking of a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    Exact,
    Semantic,
    Fresh,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    /// Final ranking after reranking and strict filtering, at most `limit` long.
    pub results: Vec<SearchResult>,
    /// Results removed by strict mode, counted over the whole ranking.
    pub suppressed: usize,
    pub origin: ResultOrigin,
    pub reranked: bool,
    /// Collectors that had not reported when the deadline expired.
    pub timed_out: Vec<String>,
}

pub struct HybridSearchEngine {
    collectors: Vec<Arc<dyn Collector>>,
    embedder: Option<Arc<dyn Embedder>>,
    reranker: Option<Arc<dyn Reranker>>,
    cache: SearchCache,
    weights: FusionWeights,
    rrf_k: f64,
    thresholds: ConfidenceThresholds,
    deadline: Duration,
    max_workers: usize,
    rerank_candidates: usize,
}

impl HybridSearchEngine {
    pub fn new(settings: &Settings) -> Self {
        Self {
            collectors: Vec::new(),
            embedder: None,
            reranker: None,
            cache: SearchCache::new(settings.cache.semantic_threshold),
            weights: FusionWeights::from_settings(&settings.fusion),
            rrf_k: settings.fusion.rrf_k,
            thresholds: ConfidenceThresholds::from_settings(&settings.confidence),
            deadline: settings.search.deadline(),
            max_workers: settings.search.max_workers.max(1),
            rerank_candidates: settings.search.rerank_candidates,
        }
    }

    pub fn with_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn thresholds(&self) -> &ConfidenceThresholds {
        &self.thresholds
    }

    pub fn sources(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.source()).collect()
    }

    pub async fn search(&self, query: &str, options: SearchOptions) -> SearchResponse {
        self.search_with_cancel(query, options, CancellationToken::new()).await
    }

    /// Run one search. Never fails: unavailable sources, timeouts, embedding
    /// and rerank failures all degrade to a smaller (possibly empty) ranking.
    pub async fn search_with_cancel(
        &self,
        query: &str,
        options: SearchOptions,
        cancel: CancellationToken,
    ) -> SearchResponse {
        let key = CacheKey::new(query, &options);
        if let Some(hit) = self.cache.get(&key) {
            tracing::info!(query = key.query(), "exact cache hit");
            return self.finish(hit.to_vec(), &options, ResultOrigin::Exact, Vec::new());
        }

        // one budget covers query embedding and the collector fan-out
        let deadline = tokio::time::Instant::now() + self.deadline;
        let embedding = self.embed_query(query, deadline, &cancel).await;
        if let Some(vector) = &embedding {
            if let Some((hit, similarity)) = self.cache.get_semantic(vector, &options) {
                tracing::info!(query = key.query(), similarity, "semantic cache hit");
                return self.finish(hit.to_vec(), &options, ResultOrigin::Semantic, Vec::new());
            }
        }

        let (lists, timed_out) = self.collect_all(query, embedding.clone(), deadline, &cancel).await;
        let mut ranked = fuse(&group_by_source(lists), &self.weights, self.rrf_k);
        if options.rerank && !ranked.is_empty() {
            ranked = self.rerank(query, ranked, options.limit).await;
        }

        if timed_out.is_empty() && !cancel.is_cancelled() {
            self.cache.insert(key, embedding, ranked.clone());
        } else {
            tracing::debug!(incomplete = ?timed_out, "partial ranking not cached");
        }
        self.finish(ranked, &options, ResultOrigin::Fresh, timed_out)
    }

    fn finish(
        &self,
        ranked: Vec<SearchResult>,
        options: &SearchOptions,
        origin: ResultOrigin,
        timed_out: Vec<String>,
    ) -> SearchResponse {
        let reranked = ranked.iter().any(|r| r.rerank_score.is_some());
        let (mut results, suppressed) = self.thresholds.apply(ranked, options.strict);
        results.truncate(options.limit);
        SearchResponse { results, suppressed, origin, reranked, timed_out }
    }

    async fn embed_query(
        &self,
        query: &str,
        deadline: tokio::time::Instant,
        cancel: &CancellationToken,
    ) -> Option<Arc<Vec<f32>>> {
        let embedder = Arc::clone(self.embedder.as_ref()?);
        let text = query.to_string();
        let budget = deadline.saturating_duration_since(tokio::time::Instant::now());
        let outcome = run_blocking("embedding", budget, cancel, move |_| {
            embedder.embed(&text).map_err(|e| Error::backend("embedder", e))
        })
        .await;
        match outcome {
            Ok(vector) => Some(Arc::new(vector)),
            Err(err) => {
                tracing::debug!(error = %err, "query embedding unavailable, semantic cache skipped");
                None
            }
        }
    }

    /// Fan out to every collector at once, bounded by `max_workers`, and
    /// gather whatever reports before `deadline`. Slots of collectors that
    /// never reported stay empty and are named in the returned list.
    async fn collect_all(
        &self,
        query: &str,
        embedding: Option<Arc<Vec<f32>>>,
        deadline: tokio::time::Instant,
        cancel: &CancellationToken,
    ) -> (Vec<Vec<SearchResult>>, Vec<String>) {
        let started = Instant::now();
        let run_token = cancel.child_token();
        let ctx = CollectContext::new(query).with_embedding(embedding).with_cancel(run_token.clone());
        let permits = Arc::new(Semaphore::new(self.max_workers));

        let mut tasks = JoinSet::new();
        for (slot, collector) in self.collectors.iter().enumerate() {
            let collector = Arc::clone(collector);
            let ctx = ctx.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (slot, collector.collect(&ctx).await)
            });
        }

        let mut slots: Vec<Option<Vec<SearchResult>>> = vec![None; self.collectors.len()];
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((slot, results))) => slots[slot] = Some(results),
                    Some(Err(err)) => tracing::warn!(error = %err, "collector task aborted"),
                },
                () = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(deadline_ms = self.deadline.as_millis() as u64, "search deadline reached");
                    break;
                }
                () = cancel.cancelled() => {
                    tracing::debug!("search cancelled by caller");
                    break;
                }
            }
        }
        run_token.cancel();
        tasks.abort_all();

        let timed_out: Vec<String> = slots
            .iter()
            .zip(&self.collectors)
            .filter(|(slot, _)| slot.is_none())
            .map(|(_, c)| c.source().to_string())
            .collect();
        let lists: Vec<Vec<SearchResult>> = slots.into_iter().map(Option::unwrap_or_default).collect();
        tracing::info!(
            sources = self.collectors.len(),
            hits = lists.iter().map(Vec::len).sum::<usize>(),
            incomplete = timed_out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection finished"
        );
        (lists, timed_out)
    }

    async fn rerank(&self, query: &str, ranked: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
        let Some(reranker) = &self.reranker else {
            tracing::debug!("rerank requested but no reranker configured");
            return ranked;
        };
        let head = self.rerank_candidates.min(ranked.len());
        match reranker.rerank(query, &ranked[..head], limit).await {
            Ok(reordered) if !reordered.is_empty() => reordered,
            Ok(_) => {
                tracing::warn!("reranker returned nothing, keeping fused order");
                ranked
            }
            Err(err) => {
                tracing::warn!(error = %err, "rerank failed, keeping fused order");
                ranked
            }
        }
    }
}
