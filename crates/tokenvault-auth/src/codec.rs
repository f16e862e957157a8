//! Document codec.
//!
//! Converts between typed records and the untyped JSON documents a
//! [`DocumentStore`] hands back. Decoding goes straight from the backend's
//! document into the concrete record type: the client field is always a
//! [`Client`](crate::types::Client) and the previous-access chain is bounded
//! by the types themselves, so decoding cannot recurse past one generation.
//! Fields the record type does not know about are dropped.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use tokenvault_storage::{Collection, DocumentStore, StorageError, StorageResult};

use crate::types::{AccessRecord, AuthorizationGrant, Client};

/// Collection holding client registrations.
pub const CLIENTS: &str = "clients";
/// Collection holding authorization grants.
pub const GRANTS: &str = "grants";
/// Collection holding access/refresh records.
pub const ACCESSES: &str = "accesses";

/// A record type with a fixed collection and a string primary key.
pub trait Record: Serialize + DeserializeOwned {
    /// Human-readable kind used in errors and logs.
    const KIND: &'static str;
    /// Collection the record lives in.
    const COLLECTION: &'static str;

    /// The record's primary key.
    fn primary_key(&self) -> &str;
}

impl Record for Client {
    const KIND: &'static str = "client";
    const COLLECTION: &'static str = CLIENTS;

    fn primary_key(&self) -> &str {
        &self.id
    }
}

impl Record for AuthorizationGrant {
    const KIND: &'static str = "grant";
    const COLLECTION: &'static str = GRANTS;

    fn primary_key(&self) -> &str {
        &self.code
    }
}

impl Record for AccessRecord {
    const KIND: &'static str = "access";
    const COLLECTION: &'static str = ACCESSES;

    fn primary_key(&self) -> &str {
        &self.access_token
    }
}

/// Encodes a record into a JSON document.
///
/// # Errors
///
/// Returns `StorageError::Codec` if the record does not serialize to a JSON object.
pub fn encode<R: Record>(record: &R) -> StorageResult<Value> {
    let document =
        serde_json::to_value(record).map_err(|e| StorageError::codec(R::KIND, e.to_string()))?;
    if !document.is_object() {
        return Err(StorageError::codec(R::KIND, "record must encode to an object"));
    }
    Ok(document)
}

/// Decodes a persisted document into a record.
///
/// # Errors
///
/// Returns `StorageError::Codec` if the document is not an object, lacks a
/// required field or has a field of the wrong type.
pub fn decode<R: Record>(document: Value) -> StorageResult<R> {
    serde_json::from_value(document).map_err(|e| {
        warn!(kind = R::KIND, error = %e, "Failed to decode stored document");
        StorageError::codec(R::KIND, e.to_string())
    })
}

/// Shortens a credential for logs and error messages.
pub(crate) fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}***")
}

/// Loads and decodes the record stored under `key`.
pub(crate) async fn load<R: Record>(
    store: &dyn DocumentStore,
    collection: &Collection,
    key: &str,
    display_key: &str,
) -> StorageResult<R> {
    let document = store
        .find_by_id(collection, key)
        .await?
        .ok_or_else(|| StorageError::not_found(R::KIND, display_key))?;
    decode(document)
}

/// Encodes `record` and upserts it under its primary key.
pub(crate) async fn save<R: Record>(
    store: &dyn DocumentStore,
    collection: &Collection,
    record: &R,
) -> StorageResult<()> {
    let key = record.primary_key();
    if key.is_empty() {
        return Err(StorageError::invalid_input(format!(
            "{} primary key must not be empty",
            R::KIND
        )));
    }
    let document = encode(record)?;
    store.upsert(collection, key, &document).await
}
