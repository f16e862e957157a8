//! Storage types for the document storage abstraction layer.
//!
//! This module defines the data types used by [`DocumentStore`](crate::DocumentStore):
//! collection addressing, equality filters, result windows and index specifications.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;

// =============================================================================
// Collection
// =============================================================================

/// A named set of documents inside a logical database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collection {
    /// Logical database name (a schema for PostgreSQL).
    pub database: String,
    /// Collection name (a table for PostgreSQL).
    pub name: String,
}

impl Collection {
    /// Creates a new collection reference.
    #[must_use]
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
        }
    }

    /// Returns `database.name`, used for logging and as an in-memory namespace.
    #[must_use]
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.name)
    }
}

// =============================================================================
// Document Filter
// =============================================================================

/// Top-level field equality filter.
///
/// A document matches when every listed field is present and equal to the
/// given value. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentFilter {
    fields: BTreeMap<String, Value>,
}

impl DocumentFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition on `field`.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Builds a filter from a JSON object such as `{"redirectUri": "https://a"}`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if `value` is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, StorageError> {
        match value {
            Value::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
            }),
            Value::Null => Ok(Self::new()),
            other => Err(StorageError::invalid_input(format!(
                "filter must be a JSON object, got {other}"
            ))),
        }
    }

    /// Returns `true` if the filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(field, value)` conditions in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Returns `true` if `document` satisfies every condition.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

// =============================================================================
// Window
// =============================================================================

/// A skip/limit window over an ordered result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    /// Number of matching documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return (`None` = unbounded).
    pub limit: Option<u64>,
}

impl Window {
    /// A window covering the whole result set.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A window with explicit skip and limit.
    #[must_use]
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit: Some(limit),
        }
    }

    /// A window selecting page `page_num` (1-based) of `page_size` documents.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if either argument is zero, or
    /// if the page starts past the largest offset a backend can address
    /// (`i64::MAX`).
    pub fn page(page_size: u32, page_num: u32) -> Result<Self, StorageError> {
        if page_size == 0 {
            return Err(StorageError::invalid_input("page size must be at least 1"));
        }
        if page_num == 0 {
            return Err(StorageError::invalid_input(
                "page number is 1-based and must be at least 1",
            ));
        }
        let skip = u64::from(page_size) * u64::from(page_num - 1);
        if i64::try_from(skip).is_err() {
            return Err(StorageError::invalid_input(format!(
                "page {page_num} of size {page_size} starts beyond the addressable range"
            )));
        }
        Ok(Self::new(skip, u64::from(page_size)))
    }
}

// =============================================================================
// Index Specification
// =============================================================================

/// Secondary index on a single top-level document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, unique per collection.
    pub name: String,
    /// Indexed top-level field.
    pub field: String,
    /// Whether indexed values must be unique.
    pub unique: bool,
    /// Whether documents lacking the field are left out of the index.
    pub sparse: bool,
    /// Whether the backend should build the index without blocking writers.
    pub background: bool,
}

impl IndexSpec {
    /// Creates a plain (non-unique, dense, foreground) index spec.
    #[must_use]
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            unique: false,
            sparse: false,
            background: false,
        }
    }

    /// Marks the index as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the index as sparse.
    #[must_use]
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Requests a background build.
    #[must_use]
    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }

    /// Returns `true` if `document` has an entry in this index.
    #[must_use]
    pub fn covers(&self, document: &Value) -> bool {
        if !self.sparse {
            return true;
        }
        !matches!(document.get(&self.field), None | Some(Value::Null))
    }
}
