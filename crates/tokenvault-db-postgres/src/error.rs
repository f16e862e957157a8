//! Error types for the PostgreSQL storage backend.

use sqlx_core::error::Error as SqlxError;
use tokenvault_storage::StorageError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL error code for unique violation (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for duplicate table (42P07).
pub const PG_DUPLICATE_TABLE: &str = "42P07";

/// PostgreSQL error code for duplicate schema (42P06).
pub const PG_DUPLICATE_SCHEMA: &str = "42P06";

/// SQLSTATE class for connection exceptions.
const PG_CONNECTION_EXCEPTION_CLASS: &str = "08";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is "undefined table" (42P01).
pub fn is_undefined_table(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNDEFINED_TABLE)
}

/// Checks if a sqlx error reports that a schema object already exists.
///
/// Concurrent `CREATE ... IF NOT EXISTS` statements can still race on the
/// catalog and fail with one of these codes.
pub fn is_duplicate_object(err: &SqlxError) -> bool {
    [PG_UNIQUE_VIOLATION, PG_DUPLICATE_TABLE, PG_DUPLICATE_SCHEMA]
        .iter()
        .any(|code| has_pg_error_code(err, code))
}

/// Checks if a sqlx error means the database could not be reached.
pub fn is_connection_failure(err: &SqlxError) -> bool {
    match err {
        SqlxError::Io(_)
        | SqlxError::Tls(_)
        | SqlxError::PoolTimedOut
        | SqlxError::PoolClosed
        | SqlxError::WorkerCrashed => true,
        SqlxError::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.starts_with(PG_CONNECTION_EXCEPTION_CLASS)),
        _ => false,
    }
}

/// Converts a sqlx error into a storage error, prefixing `context`.
pub(crate) fn storage_error(context: &str, err: SqlxError) -> StorageError {
    if is_connection_failure(&err) {
        StorageError::unavailable(format!("{context}: {err}"))
    } else {
        StorageError::backend(format!("{context}: {err}"))
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => storage_error("Database connection error", e),
            PostgresError::Config { message } => {
                StorageError::invalid_input(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
