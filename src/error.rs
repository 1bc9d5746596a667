//! Error types for XZauth
//!
//! This module defines all error kinds surfaced by the authorization core,
//! using `thiserror` for ergonomic error handling.
//!
//! Nothing in this crate retries silently; every variant carries enough
//! structured detail (attempted URLs, HTTP status, raw server body) for the
//! caller to log or display without the core doing any user-facing
//! formatting.

use thiserror::Error;

/// Main error type for XZauth operations
///
/// This enum encompasses all failure kinds that can occur during metadata
/// discovery, the authorization code flow, and token lifecycle management.
///
/// Note that an insufficient-scope response from the resource server is not
/// represented here: it is an expected outcome modelled by
/// [`InsufficientScopeSignal`](crate::step_up::InsufficientScopeSignal),
/// not a failure of this core.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Operation attempted before a configuration was supplied
    #[error("Configuration error: {0}")]
    Config(String),

    /// `complete_flow` called with no `begin_flow` in progress
    #[error("No authorization flow is in progress")]
    NoPendingFlow,

    /// The `state` returned in the redirect does not match the pending
    /// authorization attempt.  Fatal to the current flow; a fresh
    /// `begin_flow` is required.
    #[error("State mismatch in authorization callback (possible CSRF); restart the flow")]
    StateMismatch,

    /// The authorization server does not advertise PKCE `S256` support.
    /// The flow refuses to proceed rather than degrade to no PKCE or the
    /// deprecated `plain` method.
    #[error("PKCE S256 not supported by authorization server: {0}")]
    PkceUnsupported(String),

    /// Every discovery candidate URL was tried and rejected
    #[error("Metadata discovery failed after trying [{}]: {reason}", .attempted.join(", "))]
    DiscoveryFailed {
        /// Every well-known URL attempted, in order
        attempted: Vec<String>,
        /// Why the final candidate was rejected
        reason: String,
    },

    /// The token endpoint rejected the authorization code exchange
    #[error("Token endpoint returned {status}: {body}")]
    TokenExchange {
        /// HTTP status code returned by the token endpoint
        status: u16,
        /// Raw response body from the server
        body: String,
    },

    /// The token endpoint rejected the refresh exchange.  The manager
    /// additionally clears stored tokens when this surfaces from
    /// `get_valid_access_token`.
    #[error("Refresh request returned {status}: {body}")]
    TokenRefresh {
        /// HTTP status code returned by the token endpoint
        status: u16,
        /// Raw response body from the server
        body: String,
    },

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for XZauth operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
