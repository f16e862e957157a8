//! OAuth 2.0 client record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OAuth 2.0 client registration.
///
/// The protocol engine may attach arbitrary data to a client; at the storage
/// boundary that data lives in the opaque [`user_data`](Self::user_data) field
/// and everything else has a fixed shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier.
    #[serde(default)]
    pub id: String,

    /// Client secret, stored exactly as given.
    #[serde(default)]
    pub secret: String,

    /// Base redirect URI registered for the client.
    #[serde(default)]
    pub redirect_uri: String,

    /// Opaque data owned by the protocol engine. `null` when unset.
    #[serde(default)]
    pub user_data: Value,
}

impl Client {
    /// Creates a client with no user data.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            redirect_uri: redirect_uri.into(),
            user_data: Value::Null,
        }
    }

    /// Attaches opaque user data.
    #[must_use]
    pub fn with_user_data(mut self, user_data: Value) -> Self {
        self.user_data = user_data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_serializes_camel_case() {
        let client = Client::new("c1", "s3cret", "https://app.example/cb")
            .with_user_data(json!({"owner": "team-a"}));

        let value = serde_json::to_value(&client).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "c1",
                "secret": "s3cret",
                "redirectUri": "https://app.example/cb",
                "userData": {"owner": "team-a"}
            })
        );
    }

    #[test]
    fn test_client_missing_fields_default() {
        let client: Client = serde_json::from_value(json!({"id": "c1"})).unwrap();
        assert_eq!(client.id, "c1");
        assert!(client.secret.is_empty());
        assert!(client.user_data.is_null());
    }
}
