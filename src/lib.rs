//! XZauth - OAuth 2.1 authorization-client core
//!
//! This library obtains, validates, refreshes, and supplies bearer
//! credentials that let a calling application make authenticated requests
//! to a third-party resource server.  It implements the authorization code
//! flow with mandatory PKCE S256, multi-endpoint metadata discovery with
//! ordered fallback, scope-negotiation policy, token-lifecycle tracking,
//! and step-up (insufficient-scope) detection.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `pkce`: verifier/challenge/state generation and S256 support checks
//! - `challenge`: `WWW-Authenticate` Bearer challenge parsing
//! - `scope`: scope-negotiation policy
//! - `discovery`: RFC 8414 / RFC 9728 metadata discovery with fallback
//! - `flow`: authorization URL construction and token endpoint exchanges
//! - `token`: the token set and its expiry policy
//! - `manager`: the token store / lifecycle façade callers drive
//! - `step_up`: insufficient-scope detection for re-authorization
//! - `config`: per-session configuration
//! - `error`: error types and result alias
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use url::Url;
//! use xzauth::{AuthManager, OAuthConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = AuthManager::new(Arc::new(reqwest::Client::new()));
//!
//!     manager
//!         .configure(OAuthConfig {
//!             client_id: "my-client".to_string(),
//!             client_secret: None,
//!             authorization_endpoint: Url::parse("https://auth.example.com/authorize")?,
//!             token_endpoint: Url::parse("https://auth.example.com/token")?,
//!             redirect_uri: Url::parse("http://127.0.0.1:8734/callback")?,
//!             scopes: Some(vec!["read".to_string()]),
//!             resource: None,
//!         })
//!         .await;
//!
//!     let pending = manager.begin_flow(None).await?;
//!     println!("Open this URL to authorize: {}", pending.authorization_url);
//!
//!     // The caller collects `code` and `state` from the redirect,
//!     // then completes the flow:
//!     // manager.complete_flow(&code, &state).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod challenge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod manager;
pub mod pkce;
pub mod scope;
pub mod step_up;
pub mod token;

// Re-export commonly used types
pub use challenge::{parse_challenge, AuthChallenge};
pub use config::OAuthConfig;
pub use error::{AuthError, Result};
pub use manager::{AuthManager, PendingAuthorization};
pub use pkce::PkceState;
pub use scope::select_scopes;
pub use step_up::{check_insufficient_scope, InsufficientScopeSignal};
pub use token::{AuthStatus, TokenSet};
