//! ragfuse-hybrid
//!
//! Runs every configured collector concurrently under one deadline, fuses the
//! ranked lists with weighted reciprocal rank fusion, optionally reranks the
//! head of the ranking, gates it by confidence and caches the outcome under
//! both the exact query and its embedding.
pub mod cache;
pub mod confidence;
pub mod engine;
pub mod fusion;
pub mod present;
pub mod rerank;

pub use cache::{CacheKey, SearchCache};
pub use confidence::{Confidence, ConfidenceThresholds};
pub use engine::{HybridSearchEngine, ResultOrigin, SearchResponse};
pub use fusion::{fuse, group_by_source, FusionWeights};
pub use rerank::HttpReranker;
