//! Access/refresh record and its previous-access snapshot.
//!
//! On refresh a new [`AccessRecord`] replaces the old one, and the old one
//! may be kept inside the new one as its [`PreviousAccess`]. The snapshot
//! type has no `previous` field, so a stored chain is at most one
//! generation deep no matter how many refresh cycles happen.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use super::client::Client;
use super::grant::AuthorizationGrant;
use super::empty_as_none;

// =============================================================================
// Access Record
// =============================================================================

/// Access token record, optionally carrying a refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    /// Access token; primary key.
    pub access_token: String,

    /// Refresh token, if this record can be renewed. Never `Some("")`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub refresh_token: Option<String>,

    /// Snapshot of the client the token was issued to.
    #[serde(default)]
    pub client: Client,

    /// Snapshot of the grant the token was exchanged for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<AuthorizationGrant>,

    /// The record this one was refreshed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PreviousAccess>,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Lifetime in seconds, counted from `created_at`.
    #[serde(default)]
    pub expires_in: i64,

    /// Granted scope, space separated.
    #[serde(default)]
    pub scope: String,

    /// Redirect URI of the originating request.
    #[serde(default)]
    pub redirect_uri: String,

    /// Opaque data owned by the protocol engine.
    #[serde(default)]
    pub user_data: Value,
}

impl AccessRecord {
    /// Creates a record issued now, without refresh token, grant or history.
    #[must_use]
    pub fn new(access_token: impl Into<String>, client: Client) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            client,
            grant: None,
            previous: None,
            created_at: OffsetDateTime::now_utc(),
            expires_in: 0,
            scope: String::new(),
            redirect_uri: String::new(),
            user_data: Value::Null,
        }
    }

    /// Sets the refresh token. An empty string clears it.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        let refresh_token = refresh_token.into();
        self.refresh_token = (!refresh_token.is_empty()).then_some(refresh_token);
        self
    }

    #[must_use]
    pub fn with_grant(mut self, grant: AuthorizationGrant) -> Self {
        self.grant = Some(grant);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
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
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    #[must_use]
    pub fn with_user_data(mut self, user_data: Value) -> Self {
        self.user_data = user_data;
        self
    }

    /// Records `prior` as the record this one was refreshed from.
    ///
    /// `prior`'s own history is dropped.
    #[must_use]
    pub fn refreshed_from(mut self, prior: AccessRecord) -> Self {
        self.previous = Some(prior.into());
        self
    }

    /// Returns `true` if the record carries a refresh token.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Instant at which the access token stops being valid.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(self.expires_in)
    }
}

// =============================================================================
// Previous Access
// =============================================================================

/// Snapshot of the access record a newer record was refreshed from.
///
/// Same fields as [`AccessRecord`] minus `previous`. A stored document that
/// nests deeper than this has the extra levels dropped on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousAccess {
    pub access_token: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub client: Client,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<AuthorizationGrant>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(default)]
    pub expires_in: i64,

    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub redirect_uri: String,

    #[serde(default)]
    pub user_data: Value,
}

impl PreviousAccess {
    /// Converts the snapshot back into a standalone record with no history.
    #[must_use]
    pub fn into_record(self) -> AccessRecord {
        AccessRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            client: self.client,
            grant: self.grant,
            previous: None,
            created_at: self.created_at,
            expires_in: self.expires_in,
            scope: self.scope,
            redirect_uri: self.redirect_uri,
            user_data: self.user_data,
        }
    }
}

impl From<AccessRecord> for PreviousAccess {
    fn from(record: AccessRecord) -> Self {
        Self {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            client: record.client,
            grant: record.grant,
            created_at: record.created_at,
            expires_in: record.expires_in,
            scope: record.scope,
            redirect_uri: record.redirect_uri,
            user_data: record.user_data,
        }
    }
}
