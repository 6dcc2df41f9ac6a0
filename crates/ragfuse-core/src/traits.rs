use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{GraphItem, SearchResult, VectorItem};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Everything a collector may read for one search.
///
/// `embedding` is the query vector computed for the semantic cache, when that
/// succeeded; `cancel` fires when the global deadline expires.
#[derive(Debug, Clone)]
pub struct CollectContext {
    pub query: String,
    pub embedding: Option<Arc<Vec<f32>>>,
    pub cancel: CancellationToken,
}

impl CollectContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), embedding: None, cancel: CancellationToken::new() }
    }

    pub fn with_embedding(mut self, embedding: Option<Arc<Vec<f32>>>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// One knowledge backend turned into a ranked list.
///
/// Implementors write `try_collect`; callers use `collect`, which never fails:
/// any error becomes an empty list plus a warning.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Source tag of the results this collector produces.
    fn source(&self) -> &str;

    async fn try_collect(&self, ctx: &CollectContext) -> Result<Vec<SearchResult>>;

    async fn collect(&self, ctx: &CollectContext) -> Vec<SearchResult> {
        if ctx.is_cancelled() {
            return Vec::new();
        }
        match self.try_collect(ctx).await {
            Ok(results) => {
                tracing::debug!(source = self.source(), hits = results.len(), "collector finished");
                results
            }
            Err(err) => {
                tracing::warn!(source = self.source(), error = %err, "collector failed, contributing no results");
                Vec::new()
            }
        }
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Items of `kind` whose similarity to `vector` is at least `threshold`,
    /// best first, at most `limit`. Each item carries a `similarity` field.
    async fn similarity_search(
        &self,
        kind: &str,
        vector: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<VectorItem>>;
}

#[async_trait]
pub trait GraphIndex: Send + Sync {
    async fn query_graph(&self, query: &str, global_only: bool) -> Result<Vec<GraphItem>>;
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Reorder `candidates` by joint (query, candidate) relevance and return the
    /// best `top_k`, each with `rerank_score` set.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[SearchResult],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
