//! Authorization grant storage.
//!
//! Stores short-lived authorization codes together with the client snapshot
//! they were issued for. Single use is a protocol-engine convention: the
//! engine calls [`GrantStorage::remove`] once the code is exchanged.

use tracing::{debug, instrument};

use tokenvault_storage::{Collection, DocumentStore, StorageResult};

use crate::codec::{self, Record, redact};
use crate::types::AuthorizationGrant;

/// Authorization grant storage operations.
pub struct GrantStorage<'a> {
    store: &'a dyn DocumentStore,
    collection: Collection,
}

impl<'a> GrantStorage<'a> {
    /// Create a new grant storage over `store` in `database`.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore, database: &str) -> Self {
        Self {
            store,
            collection: Collection::new(database, AuthorizationGrant::COLLECTION),
        }
    }

    /// Store `grant` under its code, replacing any previous grant wholesale.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` for an empty code, or the backend
    /// error if the write fails.
    #[instrument(skip_all, fields(collection = %self.collection, code = %redact(&grant.code)))]
    pub async fn save(&self, grant: &AuthorizationGrant) -> StorageResult<()> {
        codec::save(self.store, &self.collection, grant).await?;
        debug!("Stored authorization grant");
        Ok(())
    }

    /// Load the grant issued under `code`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such grant, or a
    /// codec/backend error otherwise.
    #[instrument(skip_all, fields(collection = %self.collection, code = %redact(code)))]
    pub async fn load(&self, code: &str) -> StorageResult<AuthorizationGrant> {
        codec::load(self.store, &self.collection, code, &redact(code)).await
    }

    /// Delete the grant issued under `code`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such grant.
    #[instrument(skip_all, fields(collection = %self.collection, code = %redact(code)))]
    pub async fn remove(&self, code: &str) -> StorageResult<()> {
        self.store.delete(&self.collection, code).await?;
        debug!("Removed authorization grant");
        Ok(())
    }
}
