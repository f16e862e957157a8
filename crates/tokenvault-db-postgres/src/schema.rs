//! Schema management for the PostgreSQL storage backend.
//!
//! Every logical database is a PostgreSQL schema and every collection a
//! table inside it. Tables are created lazily on first write or index
//! bootstrap.

use std::sync::Arc;

use dashmap::DashSet;
use sqlx_core::executor::Executor;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument};

use tokenvault_storage::{Collection, IndexSpec};

use crate::error::{PostgresError, Result, is_duplicate_object};
use crate::sql;

/// Manages the schemas, tables and indexes backing document collections.
///
/// Caches which tables are known to exist so the hot path does not touch the
/// catalog.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    pool: PgPool,
    /// Cache of tables that have been verified to exist.
    /// Uses DashSet for thread-safe concurrent access.
    created_tables: Arc<DashSet<String>>,
}

impl SchemaManager {
    /// Creates a new `SchemaManager` with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            created_tables: Arc::new(DashSet::new()),
        }
    }

    /// Ensures the schema and table for `collection` exist.
    ///
    /// Idempotent; after the first success for a collection the check is a
    /// cache lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query or DDL fails.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn ensure_table(&self, collection: &Collection) -> Result<()> {
        let key = collection.namespace();

        if self.created_tables.contains(&key) {
            return Ok(());
        }

        if self.table_exists(collection).await? {
            debug!("Table {} exists in database, adding to cache", key);
            self.created_tables.insert(key);
            return Ok(());
        }

        self.execute_ddl(&sql::create_schema(collection)).await?;
        self.execute_ddl(&sql::create_table(collection)).await?;
        info!("Created table: {}", key);

        self.created_tables.insert(key);
        Ok(())
    }

    /// Ensures the table for `collection` and the index `index` on it exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the table or index cannot be created.
    #[instrument(skip(self, index), fields(collection = %collection, index = %index.name))]
    pub async fn ensure_index(&self, collection: &Collection, index: &IndexSpec) -> Result<()> {
        self.ensure_table(collection).await?;
        self.execute_ddl(&sql::create_index(collection, index))
            .await?;
        info!(
            field = %index.field,
            unique = index.unique,
            sparse = index.sparse,
            "Ensured index"
        );
        Ok(())
    }

    /// Checks if the table for `collection` exists in the database.
    #[instrument(skip(self))]
    async fn table_exists(&self, collection: &Collection) -> Result<bool> {
        let row: Option<(bool,)> = sqlx_core::query_as::query_as(
            "SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )",
        )
        .bind(&collection.database)
        .bind(&collection.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(PostgresError::from)?;

        Ok(row.map(|(exists,)| exists).unwrap_or(false))
    }

    /// Runs a DDL statement over the simple query protocol.
    ///
    /// `CREATE INDEX CONCURRENTLY` refuses to run inside a transaction block,
    /// which rules out the prepared-statement path.
    async fn execute_ddl(&self, statement: &str) -> Result<()> {
        match (&self.pool).execute(statement).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_object(&e) => {
                debug!(error = %e, "Schema object created concurrently");
                Ok(())
            }
            Err(e) => Err(PostgresError::from(e)),
        }
    }

    /// Lists the collection tables of `database`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails.
    #[instrument(skip(self))]
    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx_core::query_as::query_as(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = $1
             ORDER BY table_name",
        )
        .bind(database)
        .fetch_all(&self.pool)
        .await
        .map_err(PostgresError::from)?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// Forgets that `collection`'s table exists.
    pub(crate) fn forget(&self, collection: &Collection) {
        self.created_tables.remove(&collection.namespace());
    }
}
