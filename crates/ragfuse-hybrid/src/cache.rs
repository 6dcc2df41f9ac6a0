//! Exact and semantic result cache.
//!
//! Entries are immutable once written; inserting under an existing key swaps
//! the mapping. The semantic side only matches entries stored with the same
//! option set, so a paraphrase never returns a list built for another limit
//! or mode.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use ragfuse_core::{SearchOptions, SearchResult};

pub type CachedList = Arc<Vec<SearchResult>>;

/// Trimmed, lower-cased, inner whitespace collapsed to single spaces.
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Cosine similarity; zero for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OptionSet {
    limit: usize,
    strict: bool,
    rerank: bool,
}

impl From<&SearchOptions> for OptionSet {
    fn from(options: &SearchOptions) -> Self {
        Self { limit: options.limit, strict: options.strict, rerank: options.rerank }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    options: OptionSet,
}

impl CacheKey {
    pub fn new(query: &str, options: &SearchOptions) -> Self {
        Self { query: normalize_query(query), options: options.into() }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

struct SemanticEntry {
    key: CacheKey,
    embedding: Arc<Vec<f32>>,
    results: CachedList,
}

#[derive(Default)]
struct CacheState {
    exact: HashMap<CacheKey, CachedList>,
    semantic: Vec<SemanticEntry>,
}

pub struct SearchCache {
    threshold: f32,
    state: RwLock<CacheState>,
}

impl SearchCache {
    pub fn new(semantic_threshold: f32) -> Self {
        Self { threshold: semantic_threshold, state: RwLock::new(CacheState::default()) }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedList> {
        self.state.read().exact.get(key).cloned()
    }

    /// Best stored list whose query embedding is at least `threshold` similar
    /// to `embedding`, among entries stored with the same options.
    pub fn get_semantic(&self, embedding: &[f32], options: &SearchOptions) -> Option<(CachedList, f32)> {
        let wanted = OptionSet::from(options);
        let state = self.state.read();
        state
            .semantic
            .iter()
            .filter(|e| e.key.options == wanted)
            .map(|e| (e, cosine_similarity(embedding, &e.embedding)))
            .filter(|(_, sim)| *sim >= self.threshold)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(e, sim)| (Arc::clone(&e.results), sim))
    }

    /// Store a ranking; empty rankings are not cached. Returns whether the
    /// entry was written.
    pub fn insert(&self, key: CacheKey, embedding: Option<Arc<Vec<f32>>>, results: Vec<SearchResult>) -> bool {
        if results.is_empty() {
            return false;
        }
        let results = Arc::new(results);
        let mut state = self.state.write();
        if let Some(embedding) = embedding {
            let entry = SemanticEntry { key: key.clone(), embedding, results: Arc::clone(&results) };
            match state.semantic.iter_mut().find(|e| e.key == key) {
                Some(existing) => *existing = entry,
                None => state.semantic.push(entry),
            }
        }
        state.exact.insert(key, results);
        true
    }

    pub fn len(&self) -> usize {
        self.state.read().exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.exact.clear();
        state.semantic.clear();
    }
}
