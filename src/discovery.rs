//! OAuth 2.1 metadata discovery
//!
//! This module implements RFC 8414 Authorization Server Metadata and
//! RFC 9728 Protected Resource Metadata discovery, locating the
//! authorization and token endpoints before the authorization code flow
//! runs.
//!
//! # Discovery sequence
//!
//! 1. The caller issues an unauthenticated request to the resource server.
//! 2. The server responds with `401 Unauthorized` and a `WWW-Authenticate`
//!    header that may contain a `resource_metadata` attribute pointing at
//!    the protected resource metadata document.
//! 3. [`discover_resource_authorization`] retrieves that document (or
//!    constructs the RFC 9728 well-known URIs when no header URL is given).
//! 4. The document lists one or more authorization servers; the caller
//!    picks one and calls [`fetch_authorization_server_metadata`], which
//!    tries the well-known endpoint orderings defined by RFC 8414 and
//!    OpenID Connect Discovery 1.0 and validates each candidate before
//!    accepting it.
//!
//! Nothing here is cached: every call re-fetches.  Callers that want
//! caching key it by issuer themselves.
//!
//! # References
//!
//! - RFC 8414 <https://www.rfc-editor.org/rfc/rfc8414>
//! - RFC 9728 <https://www.rfc-editor.org/rfc/rfc9728>
//! - OpenID Connect Discovery 1.0
//!   <https://openid.net/specs/openid-connect-discovery-1_0.html>

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::challenge::parse_challenge;
use crate::error::{AuthError, Result};
use crate::scope::split_scopes;

// ---------------------------------------------------------------------------
// Protected Resource Metadata (RFC 9728)
// ---------------------------------------------------------------------------

/// Metadata document describing a protected OAuth 2.1 resource.
///
/// Retrieved from the well-known URI
/// `/.well-known/oauth-protected-resource<path>` or from the URL embedded
/// in a `WWW-Authenticate: Bearer resource_metadata=<url>` challenge
/// header.
///
/// # Examples
///
/// ```
/// use xzauth::discovery::ProtectedResourceMetadata;
///
/// let json = r#"{
///     "resource": "https://api.example.com",
///     "authorization_servers": ["https://auth.example.com"]
/// }"#;
///
/// let meta: ProtectedResourceMetadata = serde_json::from_str(json).unwrap();
/// assert_eq!(meta.resource, "https://api.example.com");
/// assert_eq!(meta.authorization_servers.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProtectedResourceMetadata {
    /// The canonical URI of the protected resource itself.
    pub resource: String,

    /// List of authorization server issuer URIs that protect this resource.
    pub authorization_servers: Vec<String>,

    /// OAuth scopes supported by this resource, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// Supported methods for presenting bearer tokens (e.g. `"header"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_methods_supported: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Authorization Server Metadata (RFC 8414 / OIDC Discovery)
// ---------------------------------------------------------------------------

/// Metadata document describing an OAuth 2.1 / OIDC authorization server.
///
/// Retrieved from one of the well-known URIs tried in order by
/// [`fetch_authorization_server_metadata`].  Treated as read-only once
/// fetched.
///
/// # Examples
///
/// ```
/// use xzauth::discovery::AuthorizationServerMetadata;
///
/// let json = r#"{
///     "issuer": "https://auth.example.com",
///     "authorization_endpoint": "https://auth.example.com/authorize",
///     "token_endpoint": "https://auth.example.com/token",
///     "response_types_supported": ["code"]
/// }"#;
///
/// let meta: AuthorizationServerMetadata = serde_json::from_str(json).unwrap();
/// assert_eq!(meta.issuer, "https://auth.example.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthorizationServerMetadata {
    /// The issuer identifier URI for this authorization server.
    pub issuer: String,

    /// The URL of the authorization endpoint (RFC 6749 section 3.1).
    pub authorization_endpoint: String,

    /// The URL of the token endpoint (RFC 6749 section 3.2).
    pub token_endpoint: String,

    /// Optional URL of the server's JSON Web Key Set document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// Optional URL of the Dynamic Client Registration endpoint (RFC 7591).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    /// List of OAuth scopes the server supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// List of `response_type` values the server supports (e.g. `["code"]`).
    pub response_types_supported: Vec<String>,

    /// List of `grant_type` values the server supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,

    /// PKCE challenge methods the server supports (e.g. `["S256"]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,

    /// Whether the server accepts a client metadata document URL as the
    /// `client_id` value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id_metadata_document_supported: Option<bool>,

    /// Additional server metadata fields not explicitly modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Client ID Metadata Document
// ---------------------------------------------------------------------------

/// A client identity document served at a stable URL that can be used
/// directly as the `client_id` value.
///
/// When the server metadata advertises
/// `client_id_metadata_document_supported: true`, the client presents the
/// URL at which this document is hosted as the `client_id` parameter in all
/// OAuth requests instead of a registered opaque identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientIdMetadataDocument {
    /// The client identifier (the URL of this document).
    pub client_id: String,

    /// Human-readable name for this client application.
    pub client_name: String,

    /// URI of the client's homepage, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,

    /// List of redirect URIs registered for this client.
    pub redirect_uris: Vec<String>,

    /// Grant types this client supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types: Option<Vec<String>>,

    /// Response types this client supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types: Option<Vec<String>>,

    /// Token endpoint authentication method (e.g. `"none"` for public
    /// clients).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
}

// ---------------------------------------------------------------------------
// Candidate URL construction
// ---------------------------------------------------------------------------

/// Returns `scheme://host[:port]` for a URL, lowercased by the `url` crate's
/// own normalization.
fn origin_of(url: &Url) -> String {
    match url.port() {
        Some(port) => format!(
            "{}://{}:{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            port
        ),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
    }
}

/// Constructs the ordered list of well-known URLs for authorization server
/// metadata discovery.
///
/// For an issuer with a non-root path `/p`:
///
/// 1. `{origin}/.well-known/oauth-authorization-server{/p}` (path insertion)
/// 2. `{origin}/.well-known/openid-configuration{/p}` (path insertion)
/// 3. `{issuer}/.well-known/openid-configuration` (path appending, OpenID
///    Connect legacy compatibility)
///
/// For a root issuer only the two origin-level candidates apply.
fn authorization_server_candidates(issuer: &Url) -> Vec<Url> {
    let origin = origin_of(issuer);
    let path = issuer.path().trim_end_matches('/');
    let mut candidates = Vec::with_capacity(3);

    // Skips candidates whose constructed string fails to parse.
    let make = |s: String| Url::parse(&s).ok();

    if path.is_empty() {
        if let Some(u) = make(format!("{origin}/.well-known/oauth-authorization-server")) {
            candidates.push(u);
        }
        if let Some(u) = make(format!("{origin}/.well-known/openid-configuration")) {
            candidates.push(u);
        }
    } else {
        if let Some(u) = make(format!(
            "{origin}/.well-known/oauth-authorization-server{path}"
        )) {
            candidates.push(u);
        }
        if let Some(u) = make(format!("{origin}/.well-known/openid-configuration{path}")) {
            candidates.push(u);
        }
        if let Some(u) = make(format!("{origin}{path}/.well-known/openid-configuration")) {
            candidates.push(u);
        }
    }

    candidates
}

/// Constructs the ordered list of well-known URLs for protected resource
/// metadata discovery.
///
/// Path insertion first when the resource has a non-root path; the root
/// form is always attempted as a fallback.
fn protected_resource_candidates(resource: &Url) -> Vec<Url> {
    let origin = origin_of(resource);
    let path = resource.path().trim_end_matches('/');
    let mut candidates = Vec::with_capacity(2);

    let make = |s: String| Url::parse(&s).ok();

    if !path.is_empty() {
        if let Some(u) = make(format!(
            "{origin}/.well-known/oauth-protected-resource{path}"
        )) {
            candidates.push(u);
        }
    }
    if let Some(u) = make(format!("{origin}/.well-known/oauth-protected-resource")) {
        candidates.push(u);
    }

    candidates
}

// ---------------------------------------------------------------------------
// Metadata validation
// ---------------------------------------------------------------------------

/// Checks that the reported `issuer` identifies the expected issuer:
/// case-insensitive origin comparison, exact path comparison.
fn issuer_matches(expected: &Url, reported: &str) -> bool {
    let Ok(reported) = Url::parse(reported) else {
        return false;
    };
    origin_of(&reported).eq_ignore_ascii_case(&origin_of(expected))
        && reported.path().trim_end_matches('/') == expected.path().trim_end_matches('/')
}

/// Validates a fetched authorization server metadata document against the
/// expected issuer, returning a rejection reason on failure.
///
/// The required string fields (`issuer`, `authorization_endpoint`,
/// `token_endpoint`) are enforced by deserialization; this adds the
/// non-empty `response_types_supported` and issuer-match rules.
fn validate_authorization_server_metadata(
    expected_issuer: &Url,
    metadata: &AuthorizationServerMetadata,
) -> std::result::Result<(), String> {
    if metadata.response_types_supported.is_empty() {
        return Err("response_types_supported is empty".to_string());
    }
    if !issuer_matches(expected_issuer, &metadata.issuer) {
        return Err(format!(
            "issuer mismatch: expected {}, metadata reports {}",
            expected_issuer, metadata.issuer
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Discovery fetchers
// ---------------------------------------------------------------------------

/// Fetches the authorization server metadata for an issuer.
///
/// Tries the well-known endpoint orderings from
/// [`authorization_server_candidates`] in sequence, returning the first
/// candidate that responds with success, deserializes, and passes
/// validation (non-empty `response_types_supported`, `issuer` matching the
/// expected origin and path).  Rejected candidates are skipped and the next
/// one is tried.
///
/// # Arguments
///
/// * `http` - Shared [`reqwest::Client`]; timeouts are whatever the caller
///   configured on it.
/// * `issuer` - The issuer URI, typically taken from protected resource
///   metadata.
///
/// # Errors
///
/// Returns [`AuthError::DiscoveryFailed`] listing every attempted URL and
/// the final rejection reason when all candidates fail.
///
/// # Examples
///
/// ```no_run
/// use url::Url;
/// use xzauth::discovery::fetch_authorization_server_metadata;
///
/// # async fn example() -> xzauth::error::Result<()> {
/// let http = reqwest::Client::new();
/// let issuer = Url::parse("https://auth.example.com/tenant1")?;
/// let meta = fetch_authorization_server_metadata(&http, &issuer).await?;
/// println!("token endpoint: {}", meta.token_endpoint);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_authorization_server_metadata(
    http: &reqwest::Client,
    issuer: &Url,
) -> Result<AuthorizationServerMetadata> {
    let candidates = authorization_server_candidates(issuer);
    let mut attempted = Vec::with_capacity(candidates.len());
    let mut last_reason = "no discovery candidates could be constructed".to_string();

    for candidate in &candidates {
        attempted.push(candidate.to_string());
        tracing::debug!(url = %candidate, "trying authorization server metadata candidate");

        let resp = match http.get(candidate.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                last_reason = format!("request to {candidate} failed: {e}");
                continue;
            }
        };

        if !resp.status().is_success() {
            last_reason = format!("{candidate} returned {}", resp.status());
            continue;
        }

        let metadata = match resp.json::<AuthorizationServerMetadata>().await {
            Ok(m) => m,
            Err(e) => {
                last_reason = format!("{candidate} returned invalid metadata: {e}");
                continue;
            }
        };

        match validate_authorization_server_metadata(issuer, &metadata) {
            Ok(()) => {
                tracing::debug!(url = %candidate, issuer = %metadata.issuer, "authorization server metadata accepted");
                return Ok(metadata);
            }
            Err(reason) => {
                last_reason = format!("{candidate} rejected: {reason}");
            }
        }
    }

    Err(AuthError::DiscoveryFailed {
        attempted,
        reason: last_reason,
    }
    .into())
}

/// Fetches one protected resource metadata document from a known URL,
/// returning a rejection reason on any failure.
async fn get_protected_resource_document(
    http: &reqwest::Client,
    url: &Url,
) -> std::result::Result<ProtectedResourceMetadata, String> {
    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| format!("request to {url} failed: {e}"))?;

    if !resp.status().is_success() {
        return Err(format!("{url} returned {}", resp.status()));
    }

    let metadata: ProtectedResourceMetadata = resp
        .json()
        .await
        .map_err(|e| format!("{url} returned invalid metadata: {e}"))?;

    if metadata.authorization_servers.is_empty() {
        return Err(format!("{url} lists no authorization servers"));
    }

    Ok(metadata)
}

/// Fetches the RFC 9728 Protected Resource Metadata document for a
/// resource via well-known URI construction.
///
/// Path insertion is tried first when the resource URL has a non-root
/// path; the root well-known URI is always attempted as a fallback.
///
/// # Errors
///
/// Returns [`AuthError::DiscoveryFailed`] listing every attempted URL when
/// no candidate yields a valid document (one with a `resource` field and a
/// non-empty `authorization_servers` list).
pub async fn fetch_protected_resource_metadata(
    http: &reqwest::Client,
    resource: &Url,
) -> Result<ProtectedResourceMetadata> {
    let candidates = protected_resource_candidates(resource);
    let mut attempted = Vec::with_capacity(candidates.len());
    let mut last_reason = "no discovery candidates could be constructed".to_string();

    for candidate in &candidates {
        attempted.push(candidate.to_string());
        tracing::debug!(url = %candidate, "trying protected resource metadata candidate");

        match get_protected_resource_document(http, candidate).await {
            Ok(metadata) => return Ok(metadata),
            Err(reason) => last_reason = reason,
        }
    }

    Err(AuthError::DiscoveryFailed {
        attempted,
        reason: last_reason,
    }
    .into())
}

// ---------------------------------------------------------------------------
// Challenge-driven discovery
// ---------------------------------------------------------------------------

/// The authorization requirements discovered for one protected resource.
#[derive(Debug, Clone)]
pub struct ResourceAuthorization {
    /// Issuer identifiers of the authorization servers protecting the
    /// resource, in the order the metadata listed them.
    pub authorization_servers: Vec<String>,

    /// The effective scope list: the challenge header's `scope` attribute
    /// when one was present, otherwise the metadata's `scopes_supported`.
    pub scopes: Option<Vec<String>>,
}

/// Discovers the authorization servers for a resource, honouring an
/// optional `WWW-Authenticate` challenge header.
///
/// When the header carries a `resource_metadata` URL, that URL is fetched
/// directly and well-known construction is skipped entirely.  Otherwise
/// discovery falls back to [`fetch_protected_resource_metadata`].
///
/// A `scope` attribute in the header takes precedence over the metadata's
/// `scopes_supported` in the returned [`ResourceAuthorization`].
///
/// # Errors
///
/// Returns [`AuthError::DiscoveryFailed`] when the metadata document
/// cannot be obtained or is invalid.
pub async fn discover_resource_authorization(
    http: &reqwest::Client,
    resource: &Url,
    www_authenticate: Option<&str>,
) -> Result<ResourceAuthorization> {
    let challenge = www_authenticate.and_then(parse_challenge);

    let metadata = match challenge
        .as_ref()
        .and_then(|c| c.resource_metadata.as_deref())
    {
        Some(metadata_url_str) => {
            let metadata_url = match Url::parse(metadata_url_str) {
                Ok(u) => u,
                Err(e) => {
                    return Err(AuthError::DiscoveryFailed {
                        attempted: vec![metadata_url_str.to_string()],
                        reason: format!("invalid resource_metadata URL: {e}"),
                    }
                    .into());
                }
            };
            tracing::debug!(url = %metadata_url, "fetching resource metadata from challenge header");
            get_protected_resource_document(http, &metadata_url)
                .await
                .map_err(|reason| AuthError::DiscoveryFailed {
                    attempted: vec![metadata_url.to_string()],
                    reason,
                })?
        }
        None => fetch_protected_resource_metadata(http, resource).await?,
    };

    let scopes = match challenge.as_ref().and_then(|c| c.scope.as_deref()) {
        Some(raw) => Some(split_scopes(raw)),
        None => metadata.scopes_supported,
    };

    Ok(ResourceAuthorization {
        authorization_servers: metadata.authorization_servers,
        scopes,
    })
}

// ---------------------------------------------------------------------------
// Client ID metadata document
// ---------------------------------------------------------------------------

/// Fetches a client ID metadata document from the given URL.
///
/// Used when the configured `client_id` is itself the HTTPS URL of such a
/// document and the authorization server advertises
/// `client_id_metadata_document_supported: true`.
///
/// # Errors
///
/// Returns [`AuthError::Http`] if the request fails and
/// [`AuthError::DiscoveryFailed`] if the endpoint responds with a
/// non-success status or an unparseable body.
pub async fn fetch_client_id_metadata_document(
    http: &reqwest::Client,
    client_id_url: &Url,
) -> Result<ClientIdMetadataDocument> {
    let resp = http
        .get(client_id_url.clone())
        .send()
        .await
        .map_err(AuthError::Http)?;

    if !resp.status().is_success() {
        return Err(AuthError::DiscoveryFailed {
            attempted: vec![client_id_url.to_string()],
            reason: format!("client id metadata endpoint returned {}", resp.status()),
        }
        .into());
    }

    let doc: ClientIdMetadataDocument =
        resp.json().await.map_err(|e| AuthError::DiscoveryFailed {
            attempted: vec![client_id_url.to_string()],
            reason: format!("failed to parse client id metadata document: {e}"),
        })?;

    Ok(doc)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
