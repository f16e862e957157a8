//! Record types persisted by tokenvault.
//!
//! Field names on the wire are camelCase; timestamps are RFC 3339 strings and
//! lifetimes are whole seconds.

pub mod access;
pub mod client;
pub mod grant;

use serde::{Deserialize, Deserializer};

pub use access::{AccessRecord, PreviousAccess};
pub use client::Client;
pub use grant::AuthorizationGrant;

/// Deserializes an optional string, mapping `""` to `None`.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
