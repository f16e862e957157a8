//! PostgreSQL implementation of the `DocumentStore` trait.

use async_trait::async_trait;
use serde_json::Value;
use sqlx_core::error::Error as SqlxError;
use sqlx_core::query::{Query, query};
use sqlx_core::query_scalar::{QueryScalar, query_scalar};
use sqlx_postgres::{PgArguments, PgPool, Postgres};
use tracing::{debug, instrument};

use tokenvault_storage::{
    Collection, DocumentFilter, DocumentStore, IndexSpec, StorageError, Window,
};

use crate::config::PostgresConfig;
use crate::error::{is_undefined_table, storage_error};
use crate::pool;
use crate::schema::SchemaManager;
use crate::sql::{self, FilterValue, Predicate};

/// PostgreSQL storage backend for JSON documents.
///
/// Cheap to clone; clones share the connection pool and the schema cache.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    schema: SchemaManager,
}

impl PostgresStore {
    /// Creates a new `PostgresStore` with the given configuration.
    ///
    /// Creates the connection pool and checks that the database answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` for an unusable configuration and
    /// `StorageError::Unavailable` if the database cannot be reached.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;
        pool::test_connection(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    /// Creates a new `PostgresStore` from an existing connection pool.
    ///
    /// This allows sharing a connection pool between multiple components.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        let schema = SchemaManager::new(pool.clone());
        Self { pool, schema }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the schema manager.
    #[must_use]
    pub fn schema(&self) -> &SchemaManager {
        &self.schema
    }

    async fn ensure_table(&self, collection: &Collection) -> Result<(), StorageError> {
        self.schema.ensure_table(collection).await.map_err(Into::into)
    }

    /// Maps a write failure, forgetting the table if it vanished underneath us.
    fn write_error(&self, collection: &Collection, context: &str, err: SqlxError) -> StorageError {
        if is_undefined_table(&err) {
            self.schema.forget(collection);
        }
        storage_error(context, err)
    }
}

fn bind_query<'q>(
    mut statement: Query<'q, Postgres, PgArguments>,
    values: &'q [FilterValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        statement = match value {
            FilterValue::Text(text) => statement.bind(text),
            FilterValue::Json(json) => statement.bind(json),
        };
    }
    statement
}

fn bind_scalar<'q, O>(
    mut statement: QueryScalar<'q, Postgres, O, PgArguments>,
    values: &'q [FilterValue],
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for value in values {
        statement = match value {
            FilterValue::Text(text) => statement.bind(text),
            FilterValue::Json(json) => statement.bind(json),
        };
    }
    statement
}

#[async_trait]
impl DocumentStore for PostgresStore {
    #[instrument(skip(self, index), fields(collection = %collection, index = %index.name))]
    async fn ensure_index(
        &self,
        collection: &Collection,
        index: &IndexSpec,
    ) -> Result<(), StorageError> {
        self.schema
            .ensure_index(collection, index)
            .await
            .map_err(|e| StorageError::index_bootstrap(&index.name, e.to_string()))
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn find_by_id(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Value>, StorageError> {
        let statement = sql::select_by_id(collection);
        match query_scalar::<Postgres, Value>(&statement)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(document) => Ok(document),
            Err(e) if is_undefined_table(&e) => Ok(None),
            Err(e) => Err(storage_error("Failed to read document", e)),
        }
    }

    #[instrument(skip(self, filter), fields(collection = %collection))]
    async fn find_one(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>, StorageError> {
        let documents = self.find(collection, filter, Window::new(0, 1)).await?;
        Ok(documents.into_iter().next())
    }

    #[instrument(skip(self, filter), fields(collection = %collection))]
    async fn find(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
        window: Window,
    ) -> Result<Vec<Value>, StorageError> {
        let predicate = sql::predicate(filter, 1);
        let statement = sql::select(collection, &predicate, window);
        match bind_scalar(query_scalar::<Postgres, Value>(&statement), &predicate.values)
            .fetch_all(&self.pool)
            .await
        {
            Ok(documents) => Ok(documents),
            Err(e) if is_undefined_table(&e) => Ok(Vec::new()),
            Err(e) => Err(storage_error("Failed to query documents", e)),
        }
    }

    #[instrument(skip(self, filter), fields(collection = %collection))]
    async fn count(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
    ) -> Result<u64, StorageError> {
        let predicate = sql::predicate(filter, 1);
        let statement = sql::count(collection, &predicate);
        match bind_scalar(query_scalar::<Postgres, i64>(&statement), &predicate.values)
            .fetch_one(&self.pool)
            .await
        {
            Ok(count) => Ok(u64::try_from(count).unwrap_or_default()),
            Err(e) if is_undefined_table(&e) => Ok(0),
            Err(e) => Err(storage_error("Failed to count documents", e)),
        }
    }

    #[instrument(skip(self, document), fields(collection = %collection))]
    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        document: &Value,
    ) -> Result<(), StorageError> {
        if !document.is_object() {
            return Err(StorageError::invalid_input(format!(
                "document '{id}' in {collection} must be a JSON object"
            )));
        }

        self.ensure_table(collection).await?;
        query(&sql::upsert(collection))
            .bind(id)
            .bind(document)
            .execute(&self.pool)
            .await
            .map_err(|e| self.write_error(collection, "Failed to upsert document", e))?;

        debug!("Upserted document");
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %collection))]
    async fn delete(&self, collection: &Collection, id: &str) -> Result<(), StorageError> {
        let result = match query(&sql::delete(collection))
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => result.rows_affected(),
            Err(e) if is_undefined_table(&e) => 0,
            Err(e) => return Err(storage_error("Failed to delete document", e)),
        };

        if result == 0 {
            return Err(StorageError::not_found(collection.name.clone(), id));
        }
        debug!("Deleted document");
        Ok(())
    }

    #[instrument(skip(self, filter), fields(collection = %collection))]
    async fn unset_field(
        &self,
        collection: &Collection,
        filter: &DocumentFilter,
        field: &str,
    ) -> Result<u64, StorageError> {
        let predicate: Predicate = sql::predicate(filter, 2);
        let statement = sql::unset_field(collection, &predicate);
        let updated = match bind_query(query(&statement).bind(field), &predicate.values)
            .execute(&self.pool)
            .await
        {
            Ok(result) => result.rows_affected(),
            Err(e) if is_undefined_table(&e) => 0,
            Err(e) => return Err(self.write_error(collection, "Failed to update documents", e)),
        };

        debug!(updated, "Unset field");
        Ok(updated)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
