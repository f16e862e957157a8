//! In-memory document storage backend for tokenvault.
//!
//! This crate provides an in-memory implementation of the `DocumentStore`
//! trait from `tokenvault-storage`, using papaya lock-free HashMap for
//! concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use tokenvault_db_memory::InMemoryStore;
//! use tokenvault_storage::{Collection, DocumentStore};
//!
//! let store = InMemoryStore::new();
//! let clients = Collection::new("oauth", "clients");
//! store.upsert(&clients, "c1", &serde_json::json!({"id": "c1"})).await?;
//! ```

pub mod storage;

pub use storage::InMemoryStore;
pub use tokenvault_storage::{DocumentStore, StorageError};

/// Creates a new shareable in-memory `DocumentStore`.
pub fn create_store() -> tokenvault_storage::DynDocumentStore {
    std::sync::Arc::new(InMemoryStore::new())
}
