//! ragfuse-vector
//!
//! Semantic collector over several logical subtypes (protocols, case
//! studies, sessions, ...) plus a LanceDB-backed `VectorStore` that keeps one
//! table per subtype. Hits keep their subtype as `source` so fusion can weight
//! each subtype on its own.
pub mod collector;
pub mod store;
pub mod table;

pub use collector::{item_to_result, VectorCollector};
pub use store::LanceVectorStore;
