//! Storage traits for the document storage abstraction layer.
//!
//! This module defines the core trait that all storage backends must implement.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::{Collection, DocumentFilter, IndexSpec, Window};

/// The trait that all document storage backends must implement.
///
/// A backend stores untyped JSON documents in named collections, each
/// document addressed by a string primary key. Implementations must be
/// thread-safe (`Send + Sync`); one instance is shared process-wide.
///
/// # Example
///
/// ```ignore
/// use tokenvault_storage::{Collection, DocumentStore, StorageError};
///
/// async fn read_client(store: &dyn DocumentStore, id: &str) -> Result<serde_json::Value, StorageError> {
///     let clients = Collection::new("oauth", "clients");
///     store
///         .find_by_id(&clients, id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("client", id))
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the collection if needed and ensures `index` exists on it.
    ///
    /// Calling this again with the same spec is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the index definition or is
    /// unreachable.
    async fn ensure_index(
        &self,
        collection: &Collection,
        index: &IndexSpec,
    ) -> Result<(), StorageError>;

    /// Reads a document by primary key.
    ///
    /// Returns `None` if the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing documents.
    async fn find_by_id(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Value>, StorageError>;

    /// Returns the first document matching `filter` in ascending primary-key order.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues or an unusable filter.
    async fn find_one(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>, StorageError>;

    /// Returns the documents matching `filter`, in ascending primary-key order,
    /// restricted to `window`.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues or an unusable filter.
    async fn find(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
        window: Window,
    ) -> Result<Vec<Value>, StorageError>;

    /// Counts the documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues or an unusable filter.
    async fn count(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
    ) -> Result<u64, StorageError>;

    /// Inserts `document` under `id`, replacing any existing document wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        document: &Value,
    ) -> Result<(), StorageError>;

    /// Deletes the document stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such document exists.
    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), StorageError>;

    /// Removes `field` from every document matching `filter`, leaving the rest
    /// of each document untouched.
    ///
    /// Returns the number of documents matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    async fn unset_field(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
        field: &str,
    ) -> Result<u64, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
