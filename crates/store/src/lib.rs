//! Durable, typed persistence for DecoyNet.
//!
//! Components never talk to a concrete backend: they hold an
//! `Arc<dyn Store>` created once at startup by [`create_store`], which
//! picks an implementation from the `STORAGE_URI` scheme:
//!
//! - `memory://` — [`MemStore`], process-local (tests, demos).
//! - `file://<dir>` (or a bare directory path) — [`JsonlStore`], an
//!   append-only events journal plus JSON snapshots per collection.
//!
//! Every operation is a single logical read or write; multi-step
//! workflows (the ingest pipeline) are orchestrated by the caller.

use std::sync::Arc;

mod error;
mod jsonl;
mod memory;
mod provider;
mod types;

pub use error::StoreError;
pub use jsonl::JsonlStore;
pub use memory::MemStore;
pub use provider::Store;
pub use types::{AlertFilter, DashboardStats, EventFilter};

/// Hard cap on rows returned by any listing operation.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Build a store from a `STORAGE_URI` value.
pub fn create_store(storage_uri: &str) -> Result<Arc<dyn Store>, StoreError> {
    let uri = storage_uri.trim();
    if uri == "memory://" || uri == "memory" {
        return Ok(Arc::new(MemStore::new()));
    }
    let dir = uri.strip_prefix("file://").unwrap_or(uri);
    if dir.is_empty() {
        return Err(StoreError::Unavailable(format!(
            "unusable STORAGE_URI \"{storage_uri}\""
        )));
    }
    let store = JsonlStore::open(std::path::Path::new(dir))?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_scheme_builds_a_store() {
        assert!(create_store("memory://").is_ok());
    }

    #[test]
    fn file_scheme_builds_a_store() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("file://{}", dir.path().display());
        assert!(create_store(&uri).is_ok());
    }

    #[test]
    fn empty_uri_is_rejected() {
        assert!(create_store("file://").is_err());
    }
}
