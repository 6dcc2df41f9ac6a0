//! ragfuse-text
//!
//! Line-oriented collectors over small curated text files: the canonical
//! reference document and the sharded tag index.
pub mod canonical;
pub mod tags;

pub use canonical::{keywords, CanonicalCollector};
pub use tags::TagCollector;
