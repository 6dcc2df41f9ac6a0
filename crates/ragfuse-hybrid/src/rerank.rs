//! HTTP cross-encoder reranker.
//!
//! Speaks the common rerank wire shape: POST `{model?, query, documents,
//! top_n}` and read back `{results: [{index, relevance_score}]}`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ragfuse_core::config::RerankSettings;
use ragfuse_core::{Error, Reranker, Result, SearchResult};

const BACKEND: &str = "reranker";

#[derive(Serialize)]
struct RerankRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    pub relevance_score: f64,
}

pub struct HttpReranker {
    client: reqwest::Client,
    endpoint: String,
    model: Option<String>,
    api_key: Option<String>,
}

impl HttpReranker {
    pub fn new(endpoint: impl Into<String>, model: Option<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::backend(BACKEND, e))?;
        Ok(Self { client, endpoint: endpoint.into(), model, api_key })
    }

    /// `None` when no endpoint is configured.
    pub fn from_settings(settings: &RerankSettings) -> Result<Option<Self>> {
        if settings.endpoint.trim().is_empty() {
            return Ok(None);
        }
        let api_key = settings.api_key_env.as_deref().and_then(|var| std::env::var(var).ok());
        Self::new(
            settings.endpoint.clone(),
            settings.model.clone(),
            api_key,
            Duration::from_millis(settings.timeout_ms),
        )
        .map(Some)
    }
}

/// Reorder `candidates` by model scores: highest first, at most `top_k`.
///
/// Out-of-range and repeated indexes are ignored.
pub fn apply_scores(candidates: &[SearchResult], hits: &[RerankHit], top_k: usize) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut scored: Vec<SearchResult> = hits
        .iter()
        .filter(|h| h.index < candidates.len() && seen.insert(h.index))
        .map(|h| {
            let mut result = candidates[h.index].clone();
            result.rerank_score = Some(h.relevance_score);
            result
        })
        .collect();
    scored.sort_by(|a, b| {
        b.rerank_score
            .unwrap_or_default()
            .partial_cmp(&a.rerank_score.unwrap_or_default())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, candidates: &[SearchResult], top_k: usize) -> Result<Vec<SearchResult>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let body = RerankRequest {
            model: self.model.as_deref(),
            query,
            documents: candidates
                .iter()
                .map(|c| if c.content.is_empty() { c.id.as_str() } else { c.content.as_str() })
                .collect(),
            top_n: top_k,
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::backend(BACKEND, e))?;
        let payload: RerankResponse = response.json().await.map_err(|e| Error::backend(BACKEND, e))?;
        tracing::debug!(candidates = candidates.len(), scored = payload.results.len(), "rerank response");
        Ok(apply_scores(candidates, &payload.results, top_k))
    }
}
