//! OAuth client registry.
//!
//! Point CRUD and paginated listing of client registrations, keyed by
//! client id.

use tracing::{debug, instrument};

use tokenvault_storage::{
    Collection, DocumentFilter, DocumentStore, StorageError, StorageResult, Window,
};

use crate::codec::{self, Record};
use crate::types::Client;

/// Client storage operations.
///
/// Borrows the handle's document store; obtain one through
/// [`OAuthStorage::clients`](crate::OAuthStorage::clients).
pub struct ClientStorage<'a> {
    store: &'a dyn DocumentStore,
    collection: Collection,
}

impl<'a> ClientStorage<'a> {
    /// Create a new client storage over `store` in `database`.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore, database: &str) -> Self {
        Self {
            store,
            collection: Collection::new(database, Client::COLLECTION),
        }
    }

    /// Find a client by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no client has this id, or the
    /// backend/codec error otherwise.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn get(&self, id: &str) -> StorageResult<Client> {
        codec::load(self.store, &self.collection, id, id).await
    }

    /// Create or overwrite the client stored under `id`.
    ///
    /// An empty `client.id` is filled in with `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if `client.id` is set and differs
    /// from `id`, or the backend error if the write fails.
    #[instrument(skip(self, client), fields(collection = %self.collection))]
    pub async fn set(&self, id: &str, client: &Client) -> StorageResult<()> {
        if !client.id.is_empty() && client.id != id {
            return Err(StorageError::invalid_input(format!(
                "client id '{}' does not match key '{}'",
                client.id, id
            )));
        }

        let mut client = client.clone();
        client.id = id.to_string();
        codec::save(self.store, &self.collection, &client).await?;
        debug!(client_id = id, "Stored client");
        Ok(())
    }

    /// Delete the client stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such client.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn remove(&self, id: &str) -> StorageResult<()> {
        self.store.delete(&self.collection, id).await?;
        debug!(client_id = id, "Removed client");
        Ok(())
    }

    /// List page `page_num` (1-based) of `page_size` clients matching `filter`,
    /// ordered by client id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if `page_size` or `page_num` is 0
    /// or the page starts beyond `i64::MAX`, a codec error if any stored client cannot be decoded, or the backend
    /// error if the query fails.
    #[instrument(skip(self, filter), fields(collection = %self.collection))]
    pub async fn list(
        &self,
        filter: &DocumentFilter,
        page_size: u32,
        page_num: u32,
    ) -> StorageResult<Vec<Client>> {
        let window = Window::page(page_size, page_num)?;
        self.store
            .find(&self.collection, filter, window)
            .await?
            .into_iter()
            .map(codec::decode::<Client>)
            .collect()
    }

    /// Count clients matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    pub async fn count(&self, filter: &DocumentFilter) -> StorageResult<u64> {
        self.store.count(&self.collection, filter).await
    }
}
