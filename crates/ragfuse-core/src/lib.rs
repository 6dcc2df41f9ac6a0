//! ragfuse-core
//!
//! Shared vocabulary of the workspace: the `SearchResult` model, the
//! collector/backend traits, typed configuration and deadline helpers.
pub mod config;
pub mod error;
pub mod task;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{CollectContext, Collector, Embedder, GraphIndex, Reranker, VectorStore};
pub use types::{SearchOptions, SearchResult, Signal};
