//! ragfuse-local
//!
//! Collectors that need nothing but the local machine: a filename walk over
//! the project tree and the embedded SQLite index, when one has been built.
pub mod filename;
pub mod sqlite;

pub use filename::FilenameCollector;
pub use sqlite::SqliteCollector;
