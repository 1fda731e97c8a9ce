//! Content loaders for reading grasp data from files.

pub mod config;
pub mod table;

pub use config::ConfigLoader;
pub use table::{InteractionTable, TableLoader, TargetSpec};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
