//! Per-session OAuth client configuration
//!
//! [`OAuthConfig`] holds everything the authorization code flow needs to run
//! against one authorization server: the client identity, the endpoint URLs,
//! the redirect URI, and the optional static scope list and RFC 8707
//! resource indicator.
//!
//! A configuration is created once by the caller before a flow starts and is
//! never mutated; to reconfigure, the caller replaces it wholesale via
//! [`AuthManager::configure`](crate::manager::AuthManager::configure).

use serde::{Deserialize, Serialize};
use url::Url;

/// Immutable configuration for one OAuth 2.1 authorization session.
///
/// The endpoint URLs may be supplied statically or taken from an
/// [`AuthorizationServerMetadata`](crate::discovery::AuthorizationServerMetadata)
/// document obtained through discovery.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use xzauth::config::OAuthConfig;
///
/// let config = OAuthConfig {
///     client_id: "my-client".to_string(),
///     client_secret: None,
///     authorization_endpoint: Url::parse("https://auth.example.com/authorize").unwrap(),
///     token_endpoint: Url::parse("https://auth.example.com/token").unwrap(),
///     redirect_uri: Url::parse("http://127.0.0.1:8734/callback").unwrap(),
///     scopes: Some(vec!["openid".to_string()]),
///     resource: None,
/// };
///
/// assert_eq!(config.client_id, "my-client");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// The OAuth client identifier.
    ///
    /// Either an opaque string issued by the authorization server, or an
    /// HTTPS URL pointing at a client ID metadata document (see
    /// [`fetch_client_id_metadata_document`](crate::discovery::fetch_client_id_metadata_document))
    /// when the server advertises `client_id_metadata_document_supported`.
    pub client_id: String,

    /// Optional client secret for confidential clients.  Public clients
    /// leave this unset; PKCE is mandatory either way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// The URL of the authorization endpoint (RFC 6749 section 3.1).
    pub authorization_endpoint: Url,

    /// The URL of the token endpoint (RFC 6749 section 3.2).
    pub token_endpoint: Url,

    /// The redirect URI registered for this client.  The caller is
    /// responsible for receiving the redirect and feeding `code` and
    /// `state` back into
    /// [`AuthManager::complete_flow`](crate::manager::AuthManager::complete_flow).
    pub redirect_uri: Url,

    /// Optional static scope list.  Lowest-priority input to scope
    /// negotiation; see [`select_scopes`](crate::scope::select_scopes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,

    /// Optional RFC 8707 resource indicator naming the protected resource
    /// the issued tokens are intended for.  When set it is sent on the
    /// authorization request, the code exchange, and every refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Url>,
}
