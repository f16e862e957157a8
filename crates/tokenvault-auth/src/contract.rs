//! Storage contract consumed by the OAuth protocol engine.

use async_trait::async_trait;

use tokenvault_storage::{DocumentFilter, StorageResult};

use crate::lifecycle::OAuthStorage;
use crate::types::{AccessRecord, AuthorizationGrant, Client};

/// Persistence operations the protocol engine calls per request.
///
/// Object safe so the engine can hold a `Box<dyn OAuthStore>` without knowing
/// the backend.
#[async_trait]
pub trait OAuthStore: Send + Sync {
    /// Finds a client by id.
    async fn get_client(&self, id: &str) -> StorageResult<Client>;

    /// Creates or overwrites the client stored under `id`.
    async fn set_client(&self, id: &str, client: &Client) -> StorageResult<()>;

    /// Deletes the client stored under `id`.
    async fn remove_client(&self, id: &str) -> StorageResult<()>;

    /// Lists page `page_num` (1-based) of clients matching `filter`.
    async fn list_clients(
        &self,
        filter: &DocumentFilter,
        page_size: u32,
        page_num: u32,
    ) -> StorageResult<Vec<Client>>;

    /// Stores a grant under its code.
    async fn save_grant(&self, grant: &AuthorizationGrant) -> StorageResult<()>;

    /// Loads the grant issued under `code`.
    async fn load_grant(&self, code: &str) -> StorageResult<AuthorizationGrant>;

    /// Deletes the grant issued under `code`.
    async fn remove_grant(&self, code: &str) -> StorageResult<()>;

    /// Stores an access record under its access token.
    async fn save_access(&self, record: &AccessRecord) -> StorageResult<()>;

    /// Loads the access record for `token`.
    async fn load_access_by_token(&self, token: &str) -> StorageResult<AccessRecord>;

    /// Loads an access record carrying `refresh_token`.
    async fn load_access_by_refresh_token(&self, refresh_token: &str)
    -> StorageResult<AccessRecord>;

    /// Deletes the access record for `token`.
    async fn remove_access(&self, token: &str) -> StorageResult<()>;

    /// Strips `refresh_token` from every record carrying it.
    async fn invalidate_refresh(&self, refresh_token: &str) -> StorageResult<u64>;

    /// Opens an independent handle over the same backend.
    fn clone_store(&self) -> Box<dyn OAuthStore>;

    /// Releases the handle. Idempotent.
    fn close(&mut self);
}

#[async_trait]
impl OAuthStore for OAuthStorage {
    async fn get_client(&self, id: &str) -> StorageResult<Client> {
        self.clients()?.get(id).await
    }

    async fn set_client(&self, id: &str, client: &Client) -> StorageResult<()> {
        self.clients()?.set(id, client).await
    }

    async fn remove_client(&self, id: &str) -> StorageResult<()> {
        self.clients()?.remove(id).await
    }

    async fn list_clients(
        &self,
        filter: &DocumentFilter,
        page_size: u32,
        page_num: u32,
    ) -> StorageResult<Vec<Client>> {
        self.clients()?.list(filter, page_size, page_num).await
    }

    async fn save_grant(&self, grant: &AuthorizationGrant) -> StorageResult<()> {
        self.grants()?.save(grant).await
    }

    async fn load_grant(&self, code: &str) -> StorageResult<AuthorizationGrant> {
        self.grants()?.load(code).await
    }

    async fn remove_grant(&self, code: &str) -> StorageResult<()> {
        self.grants()?.remove(code).await
    }

    async fn save_access(&self, record: &AccessRecord) -> StorageResult<()> {
        self.accesses()?.save(record).await
    }

    async fn load_access_by_token(&self, token: &str) -> StorageResult<AccessRecord> {
        self.accesses()?.load_by_token(token).await
    }

    async fn load_access_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> StorageResult<AccessRecord> {
        self.accesses()?.load_by_refresh_token(refresh_token).await
    }

    async fn remove_access(&self, token: &str) -> StorageResult<()> {
        self.accesses()?.remove(token).await
    }

    async fn invalidate_refresh(&self, refresh_token: &str) -> StorageResult<u64> {
        self.accesses()?.invalidate_refresh(refresh_token).await
    }

    fn clone_store(&self) -> Box<dyn OAuthStore> {
        Box::new(self.clone())
    }

    fn close(&mut self) {
        OAuthStorage::close(self);
    }
}
