//! Storage error types for the document storage abstraction layer.
//!
//! Every backend reports failures through [`StorageError`]. Backends pass
//! their errors through unmodified in meaning: nothing in the storage layer
//! retries or recovers locally.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No document matched the lookup.
    #[error("Not found: {kind} '{key}'")]
    NotFound {
        /// Kind of record that was looked up (e.g. "client").
        kind: String,
        /// Key used for the lookup.
        key: String,
    },

    /// A persisted document could not be decoded into, or encoded from, a record.
    #[error("Codec error ({kind}): {message}")]
    Codec {
        /// Kind of record being decoded.
        kind: String,
        /// Description of the shape mismatch.
        message: String,
    },

    /// A secondary index could not be created while opening the storage.
    #[error("Index bootstrap failed for '{index}': {message}")]
    IndexBootstrap {
        /// Name of the index.
        index: String,
        /// Description of the backend failure.
        message: String,
    },

    /// The backend could not be reached, or the handle was already released.
    #[error("Storage unavailable: {message}")]
    Unavailable {
        /// Description of the connection failure.
        message: String,
    },

    /// The caller supplied arguments that this layer refuses to act on.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the invalid argument.
        message: String,
    },

    /// Any other failure reported by the backend.
    #[error("Backend error: {message}")]
    Backend {
        /// Backend-provided description.
        message: String,
    },
}

impl StorageError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Creates a new `Codec` error.
    #[must_use]
    pub fn codec(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates a new `IndexBootstrap` error.
    #[must_use]
    pub fn index_bootstrap(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IndexBootstrap {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a codec error.
    #[must_use]
    pub fn is_codec(&self) -> bool {
        matches!(self, Self::Codec { .. })
    }

    /// Returns `true` if this is an index bootstrap error.
    #[must_use]
    pub fn is_index_bootstrap(&self) -> bool {
        matches!(self, Self::IndexBootstrap { .. })
    }

    /// Returns `true` if this is an unavailable error.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns `true` if this is an invalid input error.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Returns `true` for every error.
    ///
    /// Callers that do not care which kind of failure happened treat any error
    /// as "record unusable"; this predicate names that policy.
    #[must_use]
    pub fn is_unusable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("client", "c1");
        assert_eq!(err.to_string(), "Not found: client 'c1'");

        let err = StorageError::codec("access", "missing field `accessToken`");
        assert_eq!(
            err.to_string(),
            "Codec error (access): missing field `accessToken`"
        );

        let err = StorageError::index_bootstrap("idx_refresh", "permission denied");
        assert_eq!(
            err.to_string(),
            "Index bootstrap failed for 'idx_refresh': permission denied"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = StorageError::not_found("grant", "abc");
        assert!(err.is_not_found());
        assert!(!err.is_codec());
        assert!(err.is_unusable());

        let err = StorageError::unavailable("pool closed");
        assert!(err.is_unavailable());
        assert!(!err.is_not_found());
        assert!(err.is_unusable());

        let err = StorageError::invalid_input("page number must be >= 1");
        assert!(err.is_invalid_input());
        assert!(!err.is_index_bootstrap());
    }
}
