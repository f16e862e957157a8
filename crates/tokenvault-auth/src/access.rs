//! Access/refresh record storage.
//!
//! Access records are keyed by access token. The refresh token is a
//! secondary lookup key backed by a sparse, non-unique index (see
//! [`refresh_token_index`]), bootstrapped once by
//! [`OAuthStorage::open`](crate::OAuthStorage::open).

use tracing::{debug, instrument};

use tokenvault_storage::{
    Collection, DocumentFilter, DocumentStore, IndexSpec, StorageError, StorageResult,
};

use crate::codec::{self, Record, redact};
use crate::types::AccessRecord;

/// Document field holding the refresh token.
pub const REFRESH_TOKEN_FIELD: &str = "refreshToken";

/// Name of the secondary index on [`REFRESH_TOKEN_FIELD`].
pub const REFRESH_TOKEN_INDEX: &str = "idx_accesses_refresh_token";

/// Sparse, non-unique, background-built index on the refresh token.
///
/// Non-unique because several records may legitimately share a refresh
/// token; sparse because records without refresh capability omit the field.
#[must_use]
pub fn refresh_token_index() -> IndexSpec {
    IndexSpec::new(REFRESH_TOKEN_INDEX, REFRESH_TOKEN_FIELD)
        .sparse()
        .background()
}

/// Access record storage operations.
pub struct AccessStorage<'a> {
    store: &'a dyn DocumentStore,
    collection: Collection,
}

impl<'a> AccessStorage<'a> {
    /// Create a new access storage over `store` in `database`.
    #[must_use]
    pub fn new(store: &'a dyn DocumentStore, database: &str) -> Self {
        Self {
            store,
            collection: Collection::new(database, AccessRecord::COLLECTION),
        }
    }

    /// Store `record` under its access token, replacing any previous record.
    ///
    /// The embedded previous record is a [`PreviousAccess`](crate::types::PreviousAccess),
    /// so what gets written is at most one generation deep.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` for an empty access token, or the
    /// backend error if the write fails.
    #[instrument(skip_all, fields(collection = %self.collection, token = %redact(&record.access_token)))]
    pub async fn save(&self, record: &AccessRecord) -> StorageResult<()> {
        codec::save(self.store, &self.collection, record).await?;
        debug!(
            client_id = %record.client.id,
            refreshable = record.has_refresh_token(),
            chained = record.previous.is_some(),
            "Stored access record"
        );
        Ok(())
    }

    /// Load the record for `token`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such record, or a
    /// codec/backend error otherwise.
    #[instrument(skip_all, fields(collection = %self.collection, token = %redact(token)))]
    pub async fn load_by_token(&self, token: &str) -> StorageResult<AccessRecord> {
        codec::load(self.store, &self.collection, token, &redact(token)).await
    }

    /// Load a record carrying `refresh_token`.
    ///
    /// When several records share the refresh token, the one with the lowest
    /// access token is returned; no recency ordering is implied.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record carries the token (an
    /// empty token never matches), or a codec/backend error otherwise.
    #[instrument(skip_all, fields(collection = %self.collection, refresh_token = %redact(refresh_token)))]
    pub async fn load_by_refresh_token(&self, refresh_token: &str) -> StorageResult<AccessRecord> {
        let not_found = || StorageError::not_found(AccessRecord::KIND, redact(refresh_token));
        if refresh_token.is_empty() {
            return Err(not_found());
        }

        let document = self
            .store
            .find_one(&self.collection, &refresh_filter(refresh_token))
            .await?
            .ok_or_else(not_found)?;
        codec::decode(document)
    }

    /// Delete the record for `token`, including its refresh capability.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such record.
    #[instrument(skip_all, fields(collection = %self.collection, token = %redact(token)))]
    pub async fn remove(&self, token: &str) -> StorageResult<()> {
        self.store.delete(&self.collection, token).await?;
        debug!("Removed access record");
        Ok(())
    }

    /// Remove `refresh_token` from every record carrying it, keeping the
    /// access records themselves.
    ///
    /// Returns the number of records updated.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record carries the token.
    #[instrument(skip_all, fields(collection = %self.collection, refresh_token = %redact(refresh_token)))]
    pub async fn invalidate_refresh(&self, refresh_token: &str) -> StorageResult<u64> {
        let not_found = || StorageError::not_found(AccessRecord::KIND, redact(refresh_token));
        if refresh_token.is_empty() {
            return Err(not_found());
        }

        let updated = self
            .store
            .unset_field(
                &self.collection,
                &refresh_filter(refresh_token),
                REFRESH_TOKEN_FIELD,
            )
            .await?;
        if updated == 0 {
            return Err(not_found());
        }

        debug!(updated, "Invalidated refresh token");
        Ok(updated)
    }
}

fn refresh_filter(refresh_token: &str) -> DocumentFilter {
    DocumentFilter::new().eq(REFRESH_TOKEN_FIELD, refresh_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthorizationGrant, Client};
    use serde_json::json;
    use time::macros::datetime;
    use tokenvault_db_memory::InMemoryStore;

    fn client() -> Client {
        Client::new("c1", "s", "https://cb")
    }

    fn record(token: &str) -> AccessRecord {
        AccessRecord::new(token, client())
            .with_grant(
                AuthorizationGrant::new("g1", client())
                    .with_created_at(datetime!(2024-05-01 11:59 UTC)),
            )
            .with_created_at(datetime!(2024-05-01 12:00 UTC))
            .with_expires_in(3600)
            .with_scope("read")
    }

    #[tokio::test]
    async fn test_save_and_load_by_token() {
        let store = InMemoryStore::new();
        let accesses = AccessStorage::new(&store, "test");

        let access = record("a1").with_refresh_token("r1");
        accesses.save(&access).await.unwrap();
        assert_eq!(accesses.load_by_token("a1").await.unwrap(), access);
    }

    #[tokio::test]
    async fn test_load_by_refresh_token() {
        let store = InMemoryStore::new();
        let accesses = AccessStorage::new(&store, "test");
        accesses
            .save(&record("a1").with_refresh_token("r1"))
            .await
            .unwrap();
        accesses.save(&record("a2")).await.unwrap();

        let loaded = accesses.load_by_refresh_token("r1").await.unwrap();
        assert_eq!(loaded.access_token, "a1");

        assert!(
            accesses
                .load_by_refresh_token("r2")
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            accesses
                .load_by_refresh_token("")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_shared_refresh_token_returns_lowest_access_token() {
        let store = InMemoryStore::new();
        let accesses = AccessStorage::new(&store, "test");
        for token in ["a3", "a1", "a2"] {
            accesses
                .save(&record(token).with_refresh_token("shared"))
                .await
                .unwrap();
        }

        let loaded = accesses.load_by_refresh_token("shared").await.unwrap();
        assert_eq!(loaded.access_token, "a1");
    }

    #[tokio::test]
    async fn test_invalidate_refresh_keeps_access() {
        let store = InMemoryStore::new();
        let accesses = AccessStorage::new(&store, "test");
        accesses
            .save(&record("a1").with_refresh_token("r1"))
            .await
            .unwrap();

        assert_eq!(accesses.invalidate_refresh("r1").await.unwrap(), 1);

        let kept = accesses.load_by_token("a1").await.unwrap();
        assert_eq!(kept.refresh_token, None);
        assert_eq!(kept.scope, "read");
        assert!(
            accesses
                .invalidate_refresh("r1")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryStore::new();
        let accesses = AccessStorage::new(&store, "test");
        accesses.save(&record("a1")).await.unwrap();

        accesses.remove("a1").await.unwrap();
        assert!(accesses.load_by_token("a1").await.unwrap_err().is_not_found());
        assert!(accesses.remove("a1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_stored_document_has_no_empty_refresh_token() {
        let store = InMemoryStore::new();
        let accesses = AccessStorage::new(&store, "test");
        accesses
            .save(&record("a1").with_refresh_token(""))
            .await
            .unwrap();

        let collection = Collection::new("test", "accesses");
        let raw = store.find_by_id(&collection, "a1").await.unwrap().unwrap();
        assert!(raw.get(REFRESH_TOKEN_FIELD).is_none());
        assert!(!refresh_token_index().covers(&raw));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_codec_error() {
        let store = InMemoryStore::new();
        let collection = Collection::new("test", "accesses");
        store
            .upsert(
                &collection,
                "a1",
                &json!({"accessToken": "a1", "createdAt": "yesterday", "refreshToken": "r1"}),
            )
            .await
            .unwrap();

        let accesses = AccessStorage::new(&store, "test");
        assert!(accesses.load_by_token("a1").await.unwrap_err().is_codec());
        assert!(
            accesses
                .load_by_refresh_token("r1")
                .await
                .unwrap_err()
                .is_codec()
        );
    }
}
