//! Authorization grant record.
//!
//! A grant is the short-lived code handed out after user consent and
//! exchanged once for an access record. Expiry and single use are the
//! protocol engine's business; this type only carries the data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use super::client::Client;

/// Authorization grant (authorization code) with its client snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGrant {
    /// Authorization code; primary key.
    pub code: String,

    /// Snapshot of the client the code was issued to.
    #[serde(default)]
    pub client: Client,

    /// Requested scope, space separated.
    #[serde(default)]
    pub scope: String,

    /// Opaque state echoed back to the client.
    #[serde(default)]
    pub state: String,

    /// Redirect URI used in the authorization request.
    #[serde(default)]
    pub redirect_uri: String,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Lifetime in seconds, counted from `created_at`.
    #[serde(default)]
    pub expires_in: i64,

    /// Opaque data owned by the protocol engine.
    #[serde(default)]
    pub user_data: Value,

    /// PKCE code challenge, stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method (`plain` or `S256`), stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

impl AuthorizationGrant {
    /// Creates a grant issued now with no lifetime, scope or state.
    #[must_use]
    pub fn new(code: impl Into<String>, client: Client) -> Self {
        Self {
            code: code.into(),
            client,
            scope: String::new(),
            state: String::new(),
            redirect_uri: String::new(),
            created_at: OffsetDateTime::now_utc(),
            expires_in: 0,
            user_data: Value::Null,
            code_challenge: None,
            code_challenge_method: None,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    #[must_use]
    pub fn with_expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    #[must_use]
    pub fn with_user_data(mut self, user_data: Value) -> Self {
        self.user_data = user_data;
        self
    }

    /// Attaches a PKCE challenge and its method.
    #[must_use]
    pub fn with_code_challenge(
        mut self,
        challenge: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        self.code_challenge = Some(challenge.into());
        self.code_challenge_method = Some(method.into());
        self
    }

    /// Instant at which the code stops being valid.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(self.expires_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_expires_at() {
        let grant = AuthorizationGrant::new("code-1", Client::default())
            .with_created_at(datetime!(2024-05-01 12:00 UTC))
            .with_expires_in(600);
        assert_eq!(grant.expires_at(), datetime!(2024-05-01 12:10 UTC));
    }

    #[test]
    fn test_grant_wire_shape() {
        let grant = AuthorizationGrant::new("code-1", Client::new("c1", "s", "https://cb"))
            .with_scope("read write")
            .with_state("xyz")
            .with_created_at(datetime!(2024-05-01 12:00 UTC))
            .with_expires_in(600);

        let value = serde_json::to_value(&grant).unwrap();
        assert_eq!(value["code"], "code-1");
        assert_eq!(value["client"]["id"], "c1");
        assert_eq!(value["createdAt"], "2024-05-01T12:00:00Z");
        assert_eq!(value["expiresIn"], 600);
        assert!(value.get("codeChallenge").is_none());
    }

    #[test]
    fn test_pkce_fields_round_trip() {
        let grant = AuthorizationGrant::new("code-2", Client::default())
            .with_code_challenge("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM", "S256");

        let value = serde_json::to_value(&grant).unwrap();
        assert_eq!(value["codeChallengeMethod"], json!("S256"));

        let back: AuthorizationGrant = serde_json::from_value(value).unwrap();
        assert_eq!(back, grant);
    }
}
