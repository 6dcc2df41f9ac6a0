//! ragfuse-graph
//!
//! Community and entity lookups against an external knowledge-graph index.
//! The index is reached through `GraphIndex`; `CommandGraphIndex` runs a
//! query command that prints the items as JSON.
pub mod collector;
pub mod command;

pub use collector::GraphCollector;
pub use command::CommandGraphIndex;
