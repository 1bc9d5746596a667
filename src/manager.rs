//! Token store and lifecycle manager
//!
//! [`AuthManager`] is the façade callers interact with: it owns the current
//! [`OAuthConfig`], the current [`TokenSet`], and at most one pending
//! [`PkceState`], and coordinates the flow functions in [`crate::flow`]
//! into a single session lifecycle:
//!
//! - **Unconfigured** → **Configured** on [`AuthManager::configure`]
//! - **Configured, Unauthenticated** → **Authenticated** on a successful
//!   [`AuthManager::complete_flow`]
//! - **Authenticated** → **Authenticated** (token set replaced) on a
//!   successful transparent refresh
//! - **Authenticated** → **Unauthenticated** on [`AuthManager::logout`],
//!   on refresh failure, or on expiry with no refresh token
//!
//! There is no process-wide instance; the caller owns the manager and
//! shares it by reference.  All state lives behind one `tokio::sync::Mutex`
//! held across the refresh await, so concurrent
//! [`get_valid_access_token`](AuthManager::get_valid_access_token) callers
//! serialize on a single in-flight refresh instead of racing two refresh
//! requests that could invalidate each other's rotated refresh token.

use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use crate::config::OAuthConfig;
use crate::error::{AuthError, Result};
use crate::flow;
use crate::pkce::PkceState;
use crate::scope::select_scopes;
use crate::token::{AuthStatus, TokenSet};

// ---------------------------------------------------------------------------
// AuthManager
// ---------------------------------------------------------------------------

/// Mutable session state, guarded by the manager's mutex.
///
/// Both `config` and `tokens` are only ever replaced wholesale under the
/// lock, never updated field-by-field.
#[derive(Default)]
struct SessionState {
    config: Option<OAuthConfig>,
    tokens: Option<TokenSet>,
    pending: Option<PkceState>,
}

/// A started authorization attempt, returned by
/// [`AuthManager::begin_flow`].
///
/// The caller presents `authorization_url` to the resource owner
/// out-of-band (browser, device display, copy-paste) and later feeds the
/// redirect's `code` and `state` parameters into
/// [`AuthManager::complete_flow`].
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// The fully assembled authorization redirect URL.
    pub authorization_url: Url,

    /// The CSRF nonce embedded in the URL; the redirect must echo it back.
    pub state: String,
}

/// High-level coordinator for the OAuth 2.1 token lifecycle.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use url::Url;
/// use xzauth::config::OAuthConfig;
/// use xzauth::manager::AuthManager;
///
/// # async fn example() -> xzauth::error::Result<()> {
/// let manager = AuthManager::new(Arc::new(reqwest::Client::new()));
///
/// manager
///     .configure(OAuthConfig {
///         client_id: "my-client".to_string(),
///         client_secret: None,
///         authorization_endpoint: Url::parse("https://auth.example.com/authorize")?,
///         token_endpoint: Url::parse("https://auth.example.com/token")?,
///         redirect_uri: Url::parse("http://127.0.0.1:8734/callback")?,
///         scopes: Some(vec!["read".to_string()]),
///         resource: None,
///     })
///     .await;
///
/// let pending = manager.begin_flow(None).await?;
/// println!("open this URL: {}", pending.authorization_url);
///
/// // ... the caller collects code + state from the redirect ...
/// let tokens = manager.complete_flow("the_code", &pending.state).await?;
/// println!("granted scope: {:?}", tokens.scope);
/// # Ok(())
/// # }
/// ```
pub struct AuthManager {
    /// Shared HTTP client used for every token endpoint request.  Timeouts
    /// are whatever the caller configured on it.
    http: Arc<reqwest::Client>,

    /// Session state; one lock around the whole check-then-act surface.
    state: Mutex<SessionState>,
}

impl AuthManager {
    /// Creates an unconfigured manager.
    ///
    /// Call [`configure`](Self::configure) before starting a flow.
    pub fn new(http: Arc<reqwest::Client>) -> Self {
        Self {
            http,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Installs or replaces the session configuration.
    ///
    /// The configuration is replaced wholesale; any pending authorization
    /// attempt is discarded because its endpoints may no longer apply.
    /// Stored tokens are left untouched; callers switching servers should
    /// [`logout`](Self::logout) first.
    pub async fn configure(&self, config: OAuthConfig) {
        let mut state = self.state.lock().await;
        state.config = Some(config);
        state.pending = None;
    }

    /// Starts a new authorization attempt.
    ///
    /// Generates a fresh [`PkceState`], records it as the single pending
    /// attempt (replacing any prior one), and returns the authorization
    /// URL plus the CSRF `state` nonce.
    ///
    /// # Arguments
    ///
    /// * `scopes` - The scope list to request, typically the output of
    ///   [`select_scopes`].  When `None`, the configured static scopes
    ///   apply (negotiation priority 3); when the result is empty or
    ///   still `None`, the URL omits the `scope` parameter entirely.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when called before
    /// [`configure`](Self::configure).
    pub async fn begin_flow(&self, scopes: Option<&[String]>) -> Result<PendingAuthorization> {
        let mut state = self.state.lock().await;
        let config = state
            .config
            .as_ref()
            .ok_or_else(|| AuthError::Config("begin_flow called before configure".to_string()))?;

        let pkce = PkceState::new();
        let effective_scopes = match scopes {
            Some(list) => Some(list.to_vec()),
            None => select_scopes(None, None, config.scopes.as_deref()),
        };
        let authorization_url =
            flow::build_authorization_url(config, &pkce, effective_scopes.as_deref());

        let nonce = pkce.state.clone();
        state.pending = Some(pkce);

        tracing::debug!("authorization flow started");
        Ok(PendingAuthorization {
            authorization_url,
            state: nonce,
        })
    }

    /// Completes the pending authorization attempt with the redirect
    /// parameters.
    ///
    /// The pending attempt is consumed read-once: it is discarded whether
    /// the exchange succeeds or fails, so a retry always requires a fresh
    /// [`begin_flow`](Self::begin_flow).  On success the stored token set
    /// is replaced atomically and a copy is returned.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoPendingFlow`] when no attempt is in progress.
    /// - [`AuthError::StateMismatch`] when the supplied `state` does not
    ///   match the pending attempt's nonce (CSRF suspected).
    /// - [`AuthError::TokenExchange`] when the token endpoint rejects the
    ///   code.
    pub async fn complete_flow(&self, code: &str, state: &str) -> Result<TokenSet> {
        let mut session = self.state.lock().await;
        let config = session
            .config
            .clone()
            .ok_or_else(|| AuthError::Config("complete_flow called before configure".to_string()))?;
        let pending = session.pending.take().ok_or(AuthError::NoPendingFlow)?;

        if pending.state != state {
            tracing::warn!("state mismatch in authorization callback");
            return Err(AuthError::StateMismatch.into());
        }

        let tokens = flow::exchange_code(&self.http, &config, code, &pending.code_verifier).await?;
        session.tokens = Some(tokens.clone());

        tracing::debug!("authorization flow completed");
        Ok(tokens)
    }

    /// Returns a currently valid access token, refreshing transparently.
    ///
    /// - No stored tokens: returns `Ok(None)` immediately.
    /// - Stored token not expired (5-minute margin): returns it unchanged.
    /// - Expired with a refresh token: performs exactly one refresh under
    ///   the session lock; on success the stored set is replaced
    ///   atomically and the new access token returned; on failure the
    ///   stored tokens are cleared and the error propagates.
    /// - Expired with no refresh token: clears the stored tokens and
    ///   returns `Ok(None)`.  That is a normal please-re-authenticate
    ///   signal, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenRefresh`] (or a transport error) when a
    /// refresh was attempted and failed; the session is unauthenticated
    /// afterwards.
    pub async fn get_valid_access_token(&self) -> Result<Option<String>> {
        let mut session = self.state.lock().await;

        let Some(tokens) = session.tokens.clone() else {
            return Ok(None);
        };

        if !tokens.is_expired() {
            return Ok(Some(tokens.access_token));
        }

        let Some(refresh_token) = tokens.refresh_token else {
            tracing::debug!("access token expired with no refresh token; clearing session");
            session.tokens = None;
            return Ok(None);
        };

        let config = session
            .config
            .clone()
            .ok_or_else(|| AuthError::Config("token refresh requires configuration".to_string()))?;

        match flow::refresh(&self.http, &config, &refresh_token).await {
            Ok(new_tokens) => {
                let access_token = new_tokens.access_token.clone();
                session.tokens = Some(new_tokens);
                tracing::debug!("access token refreshed");
                Ok(Some(access_token))
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; clearing stored tokens");
                session.tokens = None;
                Err(e)
            }
        }
    }

    /// Returns `true` when tokens are held and not expired by the same
    /// 5-minute-margin rule.
    ///
    /// Read-only: never triggers a refresh or any network activity.
    pub async fn is_authenticated(&self) -> bool {
        let session = self.state.lock().await;
        session.tokens.as_ref().is_some_and(|t| !t.is_expired())
    }

    /// Returns a diagnostic snapshot of the session.
    ///
    /// Never mutates state and never touches the network.
    pub async fn status(&self) -> AuthStatus {
        let session = self.state.lock().await;
        match session.tokens.as_ref() {
            Some(tokens) => AuthStatus {
                authenticated: !tokens.is_expired(),
                has_refresh_token: tokens.refresh_token.is_some(),
                expires_at: tokens.expires_at,
                token_type: Some(tokens.token_type.clone()),
                scope: tokens.scope.clone(),
            },
            None => AuthStatus {
                authenticated: false,
                has_refresh_token: false,
                expires_at: None,
                token_type: None,
                scope: None,
            },
        }
    }

    /// Clears the stored token set and any pending authorization attempt.
    ///
    /// The configuration is retained; the session returns to the
    /// configured-but-unauthenticated state.
    pub async fn logout(&self) {
        let mut session = self.state.lock().await;
        session.tokens = None;
        session.pending = None;
        tracing::debug!("session logged out");
    }

    /// Test-only hook for seeding a stored token set without running the
    /// authorization flow.
    #[cfg(test)]
    pub(crate) async fn set_tokens_for_test(&self, tokens: TokenSet) {
        let mut session = self.state.lock().await;
        session.tokens = Some(tokens);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
