//! # tokenvault-storage
//!
//! Storage abstraction layer for tokenvault.
//!
//! This crate defines the trait and types that all document storage backends
//! must implement. It does not contain any implementations - those are
//! provided by separate crates:
//!
//! - `tokenvault-db-memory` - in-memory backend
//! - `tokenvault-db-postgres` - PostgreSQL backend (JSONB documents)
//!
//! ## Overview
//!
//! The main trait is [`DocumentStore`], which defines the contract for:
//! - Primary-key reads, upserts and deletes
//! - Filtered scans with skip/limit windows
//! - Partial updates that unset a single field
//! - Secondary index bootstrap
//!
//! ## Example
//!
//! ```ignore
//! use tokenvault_storage::{Collection, DocumentFilter, DocumentStore, Window};
//!
//! async fn second_page(store: &dyn DocumentStore) -> Result<Vec<serde_json::Value>, StorageError> {
//!     let clients = Collection::new("oauth", "clients");
//!     store
//!         .find(&clients, &DocumentFilter::new(), Window::page(10, 2)?)
//!         .await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::StorageError;
pub use traits::DocumentStore;
pub use types::{Collection, DocumentFilter, IndexSpec, Window};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared, process-wide document store.
pub type DynDocumentStore = std::sync::Arc<dyn DocumentStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenvault_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::StorageError;
    pub use crate::traits::DocumentStore;
    pub use crate::types::{Collection, DocumentFilter, IndexSpec, Window};
    pub use crate::{DynDocumentStore, StorageResult};
}
