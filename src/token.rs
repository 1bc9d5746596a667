//! Token set and expiry policy
//!
//! [`TokenSet`] is the canonical result of a successful code exchange or
//! refresh.  It is always replaced wholesale, never field-mutated, so a
//! concurrent reader can never observe a mix of old and new values.
//!
//! Expiry uses a safety margin: a token within [`EXPIRY_MARGIN_SECONDS`] of
//! its expiry timestamp is already treated as expired so that a refresh can
//! complete before the resource server starts rejecting the old token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Safety margin applied to expiry checks, in seconds (5 minutes).
pub const EXPIRY_MARGIN_SECONDS: i64 = 300;

// ---------------------------------------------------------------------------
// TokenSet
// ---------------------------------------------------------------------------

/// A complete OAuth 2.1 token response.
///
/// Fields map directly to the token endpoint response defined in RFC 6749
/// and refined by OAuth 2.1.  The `expires_at` field is a computed UTC
/// timestamp derived from the `expires_in` seconds returned by the server,
/// so that expiry can be determined without a server round-trip.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use xzauth::token::TokenSet;
///
/// let token = TokenSet {
///     access_token: "my_access_token".to_string(),
///     token_type: "Bearer".to_string(),
///     expires_at: Some(Utc::now() + Duration::hours(1)),
///     refresh_token: None,
///     scope: None,
/// };
///
/// assert!(!token.is_expired());
/// assert_eq!(token.bearer_header(), "Bearer my_access_token");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token string issued by the authorization server.
    pub access_token: String,

    /// The token type, normally `"Bearer"`.
    pub token_type: String,

    /// UTC timestamp at which the access token expires.
    ///
    /// A token with no expiry timestamp is treated as already expired: the
    /// server gave no lifetime, so the only safe assumption is that the
    /// token may be rejected at any moment.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub expires_at: Option<DateTime<Utc>>,

    /// Refresh token that can be used to obtain a new access token without
    /// re-running the full authorization flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Space-separated OAuth scopes granted by the authorization server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Returns `true` when the access token is expired or about to expire.
    ///
    /// A token is considered expired when its expiry timestamp is absent,
    /// already passed, or within the [`EXPIRY_MARGIN_SECONDS`] safety
    /// margin of the current time.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use xzauth::token::TokenSet;
    ///
    /// let mut token = TokenSet {
    ///     access_token: "tok".to_string(),
    ///     token_type: "Bearer".to_string(),
    ///     expires_at: None,
    ///     refresh_token: None,
    ///     scope: None,
    /// };
    ///
    /// // No expiry timestamp: treated as expired.
    /// assert!(token.is_expired());
    ///
    /// // Four minutes out is inside the five-minute margin.
    /// token.expires_at = Some(Utc::now() + Duration::minutes(4));
    /// assert!(token.is_expired());
    ///
    /// // Ten minutes out is fine.
    /// token.expires_at = Some(Utc::now() + Duration::minutes(10));
    /// assert!(!token.is_expired());
    /// ```
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => {
                let margin = chrono::Duration::seconds(EXPIRY_MARGIN_SECONDS);
                Utc::now() >= expires_at - margin
            }
        }
    }

    /// Renders the `Authorization` header value for this token.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// ---------------------------------------------------------------------------
// AuthStatus
// ---------------------------------------------------------------------------

/// Diagnostic snapshot of the current session.
///
/// Produced by [`AuthManager::status`](crate::manager::AuthManager::status);
/// never mutates state and never triggers network activity.
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    /// Whether a non-expired token set is currently held.
    pub authenticated: bool,

    /// Whether the held token set carries a refresh token.
    pub has_refresh_token: bool,

    /// Expiry timestamp of the held access token, if any.
    pub expires_at: Option<DateTime<Utc>>,

    /// Token type of the held token set, if any.
    pub token_type: Option<String>,

    /// Scope string granted by the authorization server, if any.
    pub scope: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_expiring_at(expires_at: Option<DateTime<Utc>>) -> TokenSet {
        TokenSet {
            access_token: "tok".to_string(),
            token_type: "Bearer".to_string(),
            expires_at,
            refresh_token: None,
            scope: None,
        }
    }

    // -----------------------------------------------------------------------
    // TokenSet::is_expired
    // -----------------------------------------------------------------------

    #[test]
    fn test_token_is_expired_when_past_expiry() {
        let token = token_expiring_at(Some(Utc::now() - Duration::seconds(1)));
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_is_expired_within_margin_window() {
        // Four minutes in the future is still within the five-minute margin.
        let token = token_expiring_at(Some(Utc::now() + Duration::minutes(4)));
        assert!(token.is_expired());
    }

    #[test]
    fn test_token_not_expired_when_outside_margin() {
        let token = token_expiring_at(Some(Utc::now() + Duration::minutes(10)));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_with_no_expiry_is_always_expired() {
        let token = token_expiring_at(None);
        assert!(
            token.is_expired(),
            "a token with no expiry timestamp must be treated as expired"
        );
    }

    // -----------------------------------------------------------------------
    // TokenSet::bearer_header
    // -----------------------------------------------------------------------

    #[test]
    fn test_bearer_header_format() {
        let token = token_expiring_at(None);
        assert_eq!(token.bearer_header(), "Bearer tok");
    }

    // -----------------------------------------------------------------------
    // JSON round-trip
    // -----------------------------------------------------------------------

    #[test]
    fn test_token_roundtrip_through_json() {
        let original = TokenSet {
            access_token: "access_abc".to_string(),
            token_type: "Bearer".to_string(),
            // Fixed timestamp to avoid sub-second precision issues.
            expires_at: Some(DateTime::from_timestamp(1_800_000_000, 0).expect("valid timestamp")),
            refresh_token: Some("refresh_xyz".to_string()),
            scope: Some("read write".to_string()),
        };

        let json = serde_json::to_string(&original).expect("serialize");
        let restored: TokenSet = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.access_token, original.access_token);
        assert_eq!(restored.token_type, original.token_type);
        assert_eq!(restored.expires_at, original.expires_at);
        assert_eq!(restored.refresh_token, original.refresh_token);
        assert_eq!(restored.scope, original.scope);
    }

    #[test]
    fn test_token_roundtrip_no_optional_fields() {
        let original = token_expiring_at(None);

        let json = serde_json::to_string(&original).expect("serialize");
        let restored: TokenSet = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.access_token, original.access_token);
        assert!(restored.expires_at.is_none());
        assert!(restored.refresh_token.is_none());
        assert!(restored.scope.is_none());
    }
}
