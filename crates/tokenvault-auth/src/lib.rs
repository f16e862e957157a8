//! # tokenvault-auth
//!
//! Persistence layer for an OAuth 2.0 authorization server.
//!
//! This crate provides:
//! - Client registry (point CRUD and paginated listing)
//! - Authorization grant storage keyed by code
//! - Access/refresh record storage with a one-generation refresh history
//! - A request-scoped storage handle with explicit lifecycle
//!
//! Everything is stored through a [`tokenvault_storage::DocumentStore`], so
//! the same code runs against the in-memory and PostgreSQL backends.
//!
//! ## Modules
//!
//! - [`types`] - Record types and their persisted shape
//! - [`codec`] - Record/document conversion
//! - [`client`] - Client registry
//! - [`grant`] - Authorization grants
//! - [`access`] - Access/refresh records
//! - [`lifecycle`] - Opening, cloning and releasing handles
//! - [`contract`] - The [`OAuthStore`] trait used by the protocol engine
//!
//! ## Example
//!
//! ```ignore
//! use tokenvault_auth::{OAuthStorage, OAuthStore};
//!
//! let storage = OAuthStorage::open(store, "oauth").await?;
//! let request = storage.clone_store();
//! let access = request.load_access_by_refresh_token(&refresh_token).await?;
//! ```

pub mod access;
pub mod client;
pub mod codec;
pub mod contract;
pub mod grant;
pub mod lifecycle;
pub mod types;

pub use access::{AccessStorage, REFRESH_TOKEN_FIELD, REFRESH_TOKEN_INDEX, refresh_token_index};
pub use client::ClientStorage;
pub use codec::{ACCESSES, CLIENTS, GRANTS, Record};
pub use contract::OAuthStore;
pub use grant::GrantStorage;
pub use lifecycle::OAuthStorage;
pub use types::{AccessRecord, AuthorizationGrant, Client, PreviousAccess};

pub use tokenvault_storage::{DocumentFilter, StorageError, StorageResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::contract::OAuthStore;
    pub use crate::lifecycle::OAuthStorage;
    pub use crate::types::{AccessRecord, AuthorizationGrant, Client, PreviousAccess};
    pub use tokenvault_storage::{DocumentFilter, StorageError, StorageResult};
}
