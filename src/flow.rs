//! OAuth 2.1 authorization code flow with PKCE
//!
//! This module builds the authorization redirect URL and performs the two
//! token endpoint exchanges: authorization code for tokens, and refresh
//! token for tokens.  Resource indicators (RFC 8707) are attached to every
//! request when configured.
//!
//! The functions here are stateless over `(client, config)`; the pending
//! attempt and the resulting [`TokenSet`] are owned by
//! [`AuthManager`](crate::manager::AuthManager).
//!
//! # Flow overview
//!
//! 1. Verify the authorization server supports PKCE S256
//!    ([`ensure_s256_support`](crate::pkce::ensure_s256_support)) when
//!    server metadata is available.
//! 2. Generate a [`PkceState`] and build the authorization URL.
//! 3. The caller presents the URL out-of-band and collects the redirect's
//!    `code` and `state` parameters.
//! 4. Exchange the code (plus the raw verifier) for tokens.
//!
//! # References
//!
//! - OAuth 2.1 draft <https://datatracker.ietf.org/doc/draft-ietf-oauth-v2-1/>
//! - RFC 7636 PKCE <https://www.rfc-editor.org/rfc/rfc7636>
//! - RFC 8707 Resource Indicators <https://www.rfc-editor.org/rfc/rfc8707>

use chrono::Utc;
use url::Url;

use crate::config::OAuthConfig;
use crate::error::{AuthError, Result};
use crate::pkce::PkceState;
use crate::token::TokenSet;

// ---------------------------------------------------------------------------
// Token endpoint response (raw deserialization)
// ---------------------------------------------------------------------------

/// Raw JSON response from an OAuth token endpoint.
///
/// Used only inside this module to deserialize the token response before
/// converting it into the canonical [`TokenSet`].
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Converts the raw token response into a [`TokenSet`].
    ///
    /// The relative `expires_in` seconds are converted to an absolute UTC
    /// `expires_at` timestamp computed at receipt time.
    fn into_token_set(self) -> TokenSet {
        let expires_at = self.expires_in.and_then(|secs| {
            let secs = i64::try_from(secs).ok()?;
            Utc::now().checked_add_signed(chrono::Duration::try_seconds(secs)?)
        });

        TokenSet {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at,
            refresh_token: self.refresh_token,
            scope: self.scope,
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization URL
// ---------------------------------------------------------------------------

/// Builds the authorization redirect URL for one attempt.
///
/// Always includes `response_type=code`, `client_id`, `redirect_uri`,
/// `state`, `code_challenge`, and `code_challenge_method=S256`.  The
/// `scope` parameter is present only when `scopes` is `Some` and non-empty
/// (an empty scope string is never sent); `resource` is present only when
/// the configuration carries one (RFC 8707).
///
/// PKCE support on the target server should be verified beforehand with
/// [`ensure_s256_support`](crate::pkce::ensure_s256_support) whenever
/// server metadata is in hand; there is no fallback to the deprecated
/// `plain` method.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use xzauth::config::OAuthConfig;
/// use xzauth::flow::build_authorization_url;
/// use xzauth::pkce::PkceState;
///
/// let config = OAuthConfig {
///     client_id: "my-client".to_string(),
///     client_secret: None,
///     authorization_endpoint: Url::parse("https://auth.example.com/authorize").unwrap(),
///     token_endpoint: Url::parse("https://auth.example.com/token").unwrap(),
///     redirect_uri: Url::parse("http://127.0.0.1:8734/callback").unwrap(),
///     scopes: None,
///     resource: None,
/// };
///
/// let pkce = PkceState::new();
/// let url = build_authorization_url(&config, &pkce, None);
/// assert!(url.as_str().contains("code_challenge_method=S256"));
/// assert!(!url.as_str().contains("scope="));
/// ```
pub fn build_authorization_url(
    config: &OAuthConfig,
    pkce: &PkceState,
    scopes: Option<&[String]>,
) -> Url {
    let mut url = config.authorization_endpoint.clone();

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", &config.client_id);
        query.append_pair("redirect_uri", config.redirect_uri.as_str());
        query.append_pair("state", &pkce.state);
        query.append_pair("code_challenge", &pkce.code_challenge);
        query.append_pair("code_challenge_method", "S256");
        if let Some(scopes) = scopes {
            if !scopes.is_empty() {
                query.append_pair("scope", &scopes.join(" "));
            }
        }
        if let Some(ref resource) = config.resource {
            query.append_pair("resource", resource.as_str());
        }
    }

    url
}

// ---------------------------------------------------------------------------
// Token endpoint exchanges
// ---------------------------------------------------------------------------

/// Exchanges an authorization code for tokens at the token endpoint.
///
/// POSTs a form-encoded body with `grant_type=authorization_code`, `code`,
/// `redirect_uri`, `client_id`, and `code_verifier`, plus `client_secret`
/// and `resource` when the configuration carries them.  The verifier is
/// sent raw; the server redoes the S256 hash.
///
/// # Errors
///
/// Returns [`AuthError::TokenExchange`] carrying the HTTP status and raw
/// response body on a non-success status, and [`AuthError::Http`] on
/// transport or body-decoding failures.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
    code_verifier: &str,
) -> Result<TokenSet> {
    let redirect_uri = config.redirect_uri.to_string();
    let resource = config.resource.as_ref().map(Url::to_string);

    let mut params: Vec<(&str, &str)> = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", &redirect_uri),
        ("client_id", &config.client_id),
        ("code_verifier", code_verifier),
    ];
    if let Some(ref secret) = config.client_secret {
        params.push(("client_secret", secret));
    }
    if let Some(ref resource) = resource {
        params.push(("resource", resource));
    }

    let resp = http
        .post(config.token_endpoint.clone())
        .form(&params)
        .send()
        .await
        .map_err(AuthError::Http)?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::TokenExchange { status, body }.into());
    }

    let raw: TokenResponse = resp.json().await.map_err(AuthError::Http)?;
    tracing::debug!("authorization code exchange succeeded");
    Ok(raw.into_token_set())
}

/// Exchanges a refresh token for a new token set.
///
/// POSTs a form-encoded body with `grant_type=refresh_token`,
/// `refresh_token`, and `client_id`, plus `client_secret` and `resource`
/// when configured.  Servers do not always rotate refresh tokens: when the
/// response omits one, the old refresh token is carried forward into the
/// returned [`TokenSet`].
///
/// # Errors
///
/// Returns [`AuthError::TokenRefresh`] carrying the HTTP status and raw
/// response body on a non-success status, and [`AuthError::Http`] on
/// transport or body-decoding failures.
pub async fn refresh(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<TokenSet> {
    let resource = config.resource.as_ref().map(Url::to_string);

    let mut params: Vec<(&str, &str)> = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", &config.client_id),
    ];
    if let Some(ref secret) = config.client_secret {
        params.push(("client_secret", secret));
    }
    if let Some(ref resource) = resource {
        params.push(("resource", resource));
    }

    let resp = http
        .post(config.token_endpoint.clone())
        .form(&params)
        .send()
        .await
        .map_err(AuthError::Http)?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::TokenRefresh { status, body }.into());
    }

    let raw: TokenResponse = resp.json().await.map_err(AuthError::Http)?;
    let mut token_set = raw.into_token_set();
    if token_set.refresh_token.is_none() {
        token_set.refresh_token = Some(refresh_token.to_string());
    }

    tracing::debug!("refresh token exchange succeeded");
    Ok(token_set)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
