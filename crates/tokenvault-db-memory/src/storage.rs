use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use papaya::{Compute, HashMap as PapayaHashMap, Operation};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use tokenvault_storage::{
    Collection, DocumentFilter, DocumentStore, IndexSpec, StorageError, Window,
};

/// Storage key: `(namespace, id)` where namespace is `database.collection`.
pub(crate) type StorageKey = (String, String);

pub(crate) fn make_storage_key(collection: &Collection, id: &str) -> StorageKey {
    (collection.namespace(), id.to_string())
}

/// In-memory document storage backend using papaya lock-free HashMap.
///
/// This storage implementation provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Wholesale upserts and primary-key deletes
/// - Filtered scans in ascending primary-key order
/// - Index bookkeeping with unique-constraint enforcement
/// - Per-document atomic field removal
///
/// Nothing survives the process; use it for tests and ephemeral runs.
/// Clones share the same documents and indexes.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    /// Documents keyed by `(namespace, id)`
    pub(crate) data: Arc<PapayaHashMap<StorageKey, Value>>,
    /// Index specs per namespace
    pub(crate) indexes: Arc<RwLock<HashMap<String, Vec<IndexSpec>>>>,
    /// Serializes upserts that touch a unique index, so the duplicate
    /// check and the insert cannot interleave with another such upsert.
    unique_writes: Arc<Mutex<()>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            indexes: Arc::new(RwLock::new(HashMap::new())),
            unique_writes: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the indexes registered on `collection`.
    pub async fn indexes(&self, collection: &Collection) -> Vec<IndexSpec> {
        let guard = self.indexes.read().await;
        guard
            .get(&collection.namespace())
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `(id, document)` pairs of `collection` that match `filter`,
    /// sorted by id.
    fn scan(&self, collection: &Collection, filter: &DocumentFilter) -> Vec<(String, Value)> {
        let namespace = collection.namespace();
        let guard = self.data.pin();
        let mut matched: Vec<(String, Value)> = guard
            .iter()
            .filter(|(key, doc)| key.0 == namespace && filter.matches(doc))
            .map(|(key, doc)| (key.1.clone(), doc.clone()))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        matched
    }

    /// Unique indexes on `collection` that `document` falls under.
    async fn unique_indexes(&self, collection: &Collection, document: &Value) -> Vec<IndexSpec> {
        self.indexes(collection)
            .await
            .into_iter()
            .filter(|index| index.unique && index.covers(document))
            .collect()
    }

    /// Rejects `document` if another document already holds its value for
    /// one of `unique`.
    fn check_unique(
        &self,
        collection: &Collection,
        id: &str,
        document: &Value,
        unique: &[IndexSpec],
    ) -> Result<(), StorageError> {
        for index in unique {
            let Some(value) = document.get(&index.field) else {
                continue;
            };
            let filter = DocumentFilter::new().eq(index.field.clone(), value.clone());
            if self
                .scan(collection, &filter)
                .iter()
                .any(|(other, _)| other != id)
            {
                return Err(StorageError::backend(format!(
                    "duplicate key for unique index '{}' on {}",
                    index.name, collection
                )));
            }
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ensure_index(
        &self,
        collection: &Collection,
        index: &IndexSpec,
    ) -> Result<(), StorageError> {
        let mut guard = self.indexes.write().await;
        let specs = guard.entry(collection.namespace()).or_default();
        match specs.iter().find(|existing| existing.name == index.name) {
            Some(existing) if existing == index => Ok(()),
            Some(_) => Err(StorageError::backend(format!(
                "index '{}' already exists on {} with different options",
                index.name, collection
            ))),
            None => {
                debug!(collection = %collection, index = %index.name, "Registered in-memory index");
                specs.push(index.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Value>, StorageError> {
        let key = make_storage_key(collection, id);
        let guard = self.data.pin();
        Ok(guard.get(&key).cloned())
    }

    async fn find_one(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>, StorageError> {
        Ok(self
            .scan(collection, filter)
            .into_iter()
            .next()
            .map(|(_, doc)| doc))
    }

    async fn find(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
        window: Window,
    ) -> Result<Vec<Value>, StorageError> {
        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let limit = window
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(self
            .scan(collection, filter)
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, doc)| doc)
            .collect())
    }

    async fn count(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
    ) -> Result<u64, StorageError> {
        Ok(self.scan(collection, filter).len() as u64)
    }

    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        document: &Value,
    ) -> Result<(), StorageError> {
        if !document.is_object() {
            return Err(StorageError::invalid_input(format!(
                "document for {collection}/{id} must be a JSON object"
            )));
        }
        let key = make_storage_key(collection, id);
        let unique = self.unique_indexes(collection, document).await;
        if unique.is_empty() {
            self.data.pin().insert(key, document.clone());
            return Ok(());
        }

        let _serialized = self.unique_writes.lock().await;
        self.check_unique(collection, id, document, &unique)?;
        self.data.pin().insert(key, document.clone());
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), StorageError> {
        let key = make_storage_key(collection, id);
        let guard = self.data.pin();
        match guard.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found(collection.name.clone(), id)),
        }
    }

    async fn unset_field(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
        field: &str,
    ) -> Result<u64, StorageError> {
        let candidates = self.scan(collection, filter);
        let guard = self.data.pin();
        let mut matched = 0u64;
        for (id, _) in candidates {
            // The document may have been replaced since the scan; only the
            // current version is edited, and only if it still matches.
            let outcome = guard.compute(make_storage_key(collection, &id), |entry| match entry {
                Some((_, doc)) if filter.matches(doc) => {
                    let mut updated = doc.clone();
                    let removed = updated.as_object_mut().and_then(|map| map.remove(field));
                    if removed.is_some() {
                        Operation::Insert(updated)
                    } else {
                        Operation::Abort(true)
                    }
                }
                _ => Operation::Abort(false),
            });
            if matches!(outcome, Compute::Updated { .. } | Compute::Aborted(true)) {
                matched += 1;
            }
        }
        Ok(matched)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accesses() -> Collection {
        Collection::new("test", "accesses")
    }

    #[tokio::test]
    async fn test_upsert_replaces_wholesale() {
        let store = InMemoryStore::new();
        let col = accesses();

        store
            .upsert(&col, "a1", &json!({"accessToken": "a1", "scope": "read"}))
            .await
            .unwrap();
        store
            .upsert(&col, "a1", &json!({"accessToken": "a1"}))
            .await
            .unwrap();

        let doc = store.find_by_id(&col, "a1").await.unwrap().unwrap();
        assert_eq!(doc, json!({"accessToken": "a1"}));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryStore::new();
        store
            .upsert(&accesses(), "x", &json!({"v": 1}))
            .await
            .unwrap();

        let other = Collection::new("other", "accesses");
        assert!(store.find_by_id(&other, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.delete(&accesses(), "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_orders_by_id_and_windows() {
        let store = InMemoryStore::new();
        let col = Collection::new("test", "clients");
        for i in (1..=5).rev() {
            let id = format!("c{i}");
            store.upsert(&col, &id, &json!({"id": id})).await.unwrap();
        }

        let page = store
            .find(&col, &DocumentFilter::new(), Window::new(1, 2))
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c2", "c3"]);

        let all = store
            .find(&col, &DocumentFilter::new(), Window::all())
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(store.count(&col, &DocumentFilter::new()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unset_field_keeps_document() {
        let store = InMemoryStore::new();
        let col = accesses();
        store
            .upsert(&col, "a1", &json!({"accessToken": "a1", "refreshToken": "r"}))
            .await
            .unwrap();
        store
            .upsert(&col, "a2", &json!({"accessToken": "a2", "refreshToken": "r"}))
            .await
            .unwrap();

        let filter = DocumentFilter::new().eq("refreshToken", "r");
        let updated = store.unset_field(&col, &filter, "refreshToken").await.unwrap();
        assert_eq!(updated, 2);

        let doc = store.find_by_id(&col, "a1").await.unwrap().unwrap();
        assert_eq!(doc, json!({"accessToken": "a1"}));
        assert!(store.find_one(&col, &filter).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unset_field_never_reverts_a_concurrent_upsert() {
        let store = InMemoryStore::new();
        let col = accesses();
        for i in 0..2000 {
            let id = format!("pad{i:04}");
            store.upsert(&col, &id, &json!({"accessToken": id})).await.unwrap();
        }

        let filter = DocumentFilter::new().eq("refreshToken", "r");
        for round in 0..200 {
            store
                .upsert(&col, "a1", &json!({"accessToken": "a1", "refreshToken": "r", "scope": "old"}))
                .await
                .unwrap();

            let unset = {
                let (store, col, filter) = (store.clone(), col.clone(), filter.clone());
                tokio::spawn(async move { store.unset_field(&col, &filter, "refreshToken").await })
            };
            let scope = format!("new{round}");
            let upsert = {
                let (store, col) = (store.clone(), col.clone());
                let document = json!({"accessToken": "a1", "refreshToken": "r2", "scope": &scope});
                tokio::spawn(async move { store.upsert(&col, "a1", &document).await })
            };
            unset.await.unwrap().unwrap();
            upsert.await.unwrap().unwrap();

            let doc = store.find_by_id(&col, "a1").await.unwrap().unwrap();
            assert_eq!(doc["scope"], json!(scope), "round {round}");
            assert_eq!(doc["refreshToken"], "r2", "round {round}");
        }
    }

    #[tokio::test]
    async fn test_unset_field_counts_matches_without_the_field() {
        let store = InMemoryStore::new();
        let col = accesses();
        store
            .upsert(&col, "a1", &json!({"accessToken": "a1", "scope": "read"}))
            .await
            .unwrap();

        let filter = DocumentFilter::new().eq("scope", "read");
        assert_eq!(store.unset_field(&col, &filter, "refreshToken").await.unwrap(), 1);
        let missing = DocumentFilter::new().eq("scope", "write");
        assert_eq!(store.unset_field(&col, &missing, "scope").await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unique_index_holds_under_concurrent_upserts() {
        let store = InMemoryStore::new();
        let col = Collection::new("test", "clients");
        let index = IndexSpec::new("idx_secret", "secret").unique().sparse();
        store.ensure_index(&col, &index).await.unwrap();

        for round in 0..100 {
            let secret = format!("s{round}");
            let writers: Vec<_> = (0..4)
                .map(|writer| {
                    let (store, col) = (store.clone(), col.clone());
                    let document = json!({"secret": &secret});
                    tokio::spawn(async move {
                        store.upsert(&col, &format!("c{round}-{writer}"), &document).await
                    })
                })
                .collect();
            let mut accepted = 0;
            for writer in writers {
                if writer.await.unwrap().is_ok() {
                    accepted += 1;
                }
            }
            assert_eq!(accepted, 1, "round {round}");

            let filter = DocumentFilter::new().eq("secret", secret.as_str());
            assert_eq!(store.count(&col, &filter).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let store = InMemoryStore::new();
        let col = accesses();
        let index = IndexSpec::new("idx_refresh", "refreshToken").sparse();

        store.ensure_index(&col, &index).await.unwrap();
        store.ensure_index(&col, &index).await.unwrap();
        assert_eq!(store.indexes(&col).await, vec![index]);

        let conflicting = IndexSpec::new("idx_refresh", "refreshToken").unique();
        assert!(store.ensure_index(&col, &conflicting).await.is_err());
    }

    #[tokio::test]
    async fn test_unique_sparse_index_is_enforced() {
        let store = InMemoryStore::new();
        let col = Collection::new("test", "clients");
        let index = IndexSpec::new("idx_secret", "secret").unique().sparse();
        store.ensure_index(&col, &index).await.unwrap();

        store.upsert(&col, "c1", &json!({"secret": "s"})).await.unwrap();
        store.upsert(&col, "c1", &json!({"secret": "s"})).await.unwrap();
        assert!(store.upsert(&col, "c2", &json!({"secret": "s"})).await.is_err());

        // Documents without the field are outside a sparse index.
        store.upsert(&col, "c3", &json!({})).await.unwrap();
        store.upsert(&col, "c4", &json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_non_object_documents() {
        let store = InMemoryStore::new();
        let err = store
            .upsert(&accesses(), "a1", &json!("scalar"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }
}
