//! Storage handle lifecycle.
//!
//! [`OAuthStorage::open`] bootstraps the collections once per process and
//! returns the first handle. Each request clones its own handle; clones share
//! the process-wide [`DynDocumentStore`] (and with it the backend's connection
//! pool) but carry their own session id and open/closed state. A handle is
//! released by [`OAuthStorage::close`] or when it is dropped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, instrument};
use uuid::Uuid;

use tokenvault_storage::{
    Collection, DocumentStore, DynDocumentStore, StorageError, StorageResult,
};

use crate::access::{AccessStorage, refresh_token_index};
use crate::client::ClientStorage;
use crate::codec::ACCESSES;
use crate::grant::GrantStorage;

/// Request-scoped handle to the OAuth collections of one logical database.
pub struct OAuthStorage {
    /// `None` once the handle has been released.
    store: Option<DynDocumentStore>,
    database: Arc<str>,
    session_id: Uuid,
    /// Open handles descended from the same `open` call.
    open_sessions: Arc<AtomicUsize>,
}

impl OAuthStorage {
    /// Opens the OAuth collections in `database` and returns the first handle.
    ///
    /// Ensures the refresh-token index on the `accesses` collection. The call
    /// is idempotent against an already bootstrapped database.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` for an empty database name and
    /// `StorageError::IndexBootstrap` if the index cannot be created; no
    /// handle is returned in either case.
    #[instrument(skip(store), fields(backend = store.backend_name()))]
    pub async fn open(store: DynDocumentStore, database: &str) -> StorageResult<Self> {
        if database.is_empty() {
            return Err(StorageError::invalid_input("database name must not be empty"));
        }

        let index = refresh_token_index();
        let accesses = Collection::new(database, ACCESSES);
        store
            .ensure_index(&accesses, &index)
            .await
            .map_err(|e| match e {
                StorageError::IndexBootstrap { .. } => e,
                other => StorageError::index_bootstrap(&index.name, other.to_string()),
            })?;

        let handle = Self {
            store: Some(store),
            database: Arc::from(database),
            session_id: Uuid::new_v4(),
            open_sessions: Arc::new(AtomicUsize::new(1)),
        };
        info!(
            session = %handle.session_id,
            index = %index.name,
            "OAuth storage opened"
        );
        Ok(handle)
    }

    /// Client registry operations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the handle has been closed.
    pub fn clients(&self) -> StorageResult<ClientStorage<'_>> {
        Ok(ClientStorage::new(self.store()?, &self.database))
    }

    /// Authorization grant operations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the handle has been closed.
    pub fn grants(&self) -> StorageResult<GrantStorage<'_>> {
        Ok(GrantStorage::new(self.store()?, &self.database))
    }

    /// Access/refresh record operations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the handle has been closed.
    pub fn accesses(&self) -> StorageResult<AccessStorage<'_>> {
        Ok(AccessStorage::new(self.store()?, &self.database))
    }

    /// Releases this handle. Closing an already released handle does nothing.
    pub fn close(&mut self) {
        if self.store.take().is_some() {
            let remaining = self
                .open_sessions
                .fetch_sub(1, Ordering::AcqRel)
                .saturating_sub(1);
            debug!(
                session = %self.session_id,
                database = %self.database,
                remaining,
                "Released OAuth storage handle"
            );
        }
    }

    /// Returns `true` once the handle has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.store.is_none()
    }

    /// Logical database this handle operates on.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Identifier of this handle, for correlating log lines.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Number of handles from the same `open` that are still open.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::Acquire)
    }

    fn store(&self) -> StorageResult<&dyn DocumentStore> {
        self.store.as_deref().ok_or_else(|| {
            StorageError::unavailable(format!(
                "storage handle {} has been closed",
                self.session_id
            ))
        })
    }
}

impl Clone for OAuthStorage {
    /// Creates an independent handle over the same store.
    ///
    /// Cloning a closed handle yields a closed handle.
    fn clone(&self) -> Self {
        if self.store.is_some() {
            self.open_sessions.fetch_add(1, Ordering::AcqRel);
        }
        Self {
            store: self.store.clone(),
            database: Arc::clone(&self.database),
            session_id: Uuid::new_v4(),
            open_sessions: Arc::clone(&self.open_sessions),
        }
    }
}

impl Drop for OAuthStorage {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for OAuthStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthStorage")
            .field("database", &self.database)
            .field("session_id", &self.session_id)
            .field("closed", &self.is_closed())
            .field(
                "backend",
                &self.store.as_ref().map(|store| store.backend_name()),
            )
            .finish()
    }
}
