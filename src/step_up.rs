//! Step-up authorization detection
//!
//! A resource server that needs a higher privilege level rejects a request
//! with `403 Forbidden` and a `WWW-Authenticate: Bearer
//! error="insufficient_scope"` challenge (RFC 6750 section 3.1).  This
//! module turns that response into a typed [`InsufficientScopeSignal`]
//! telling the caller which scopes to request on the next authorization
//! attempt.
//!
//! The signal is an expected outcome, not an error: the caller feeds
//! `required_scopes` into a fresh
//! [`begin_flow`](crate::manager::AuthManager::begin_flow) and owns any
//! retry policy; this core never retries on its own.

use crate::challenge::parse_challenge;
use crate::scope::split_scopes;

/// The OAuth error code indicating a step-up is needed.
const INSUFFICIENT_SCOPE: &str = "insufficient_scope";

/// A detected insufficient-scope rejection.
///
/// # Examples
///
/// ```
/// use xzauth::step_up::check_insufficient_scope;
///
/// let header = r#"Bearer error="insufficient_scope", scope="read write admin""#;
/// let signal = check_insufficient_scope(403, Some(header), None).unwrap();
/// assert_eq!(signal.required_scopes, vec!["read", "write", "admin"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientScopeSignal {
    /// The scopes the server says are required, parsed from the
    /// challenge's `scope` attribute (space-delimited, empties dropped).
    pub required_scopes: Vec<String>,

    /// The caller's current scopes, passed through for diagnostics.
    pub current_scopes: Option<Vec<String>>,

    /// The challenge's `resource_metadata` URL, when present.
    pub resource_metadata: Option<String>,

    /// The challenge's human-readable `error_description`, when present.
    pub description: Option<String>,
}

/// Inspects a resource server response for an insufficient-scope rejection.
///
/// Returns `None` unless all of the following hold:
///
/// - `status` is `403`,
/// - a `WWW-Authenticate` header is present and parses as a Bearer
///   challenge,
/// - the challenge's `error` is exactly `insufficient_scope`,
/// - the challenge carries a `scope` attribute.
///
/// An `insufficient_scope` challenge without a `scope` attribute carries no
/// actionable scope list and deliberately yields `None` rather than a
/// signal with an empty list.
///
/// # Arguments
///
/// * `status` - HTTP status code of the resource server response.
/// * `www_authenticate` - The response's `WWW-Authenticate` header value,
///   if any.
/// * `current_scopes` - The scopes the rejected request was made with,
///   echoed into the signal for diagnostics.
///
/// # Examples
///
/// ```
/// use xzauth::step_up::check_insufficient_scope;
///
/// let header = r#"Bearer error="insufficient_scope", scope="admin""#;
///
/// // A 401 is re-authentication, not step-up.
/// assert!(check_insufficient_scope(401, Some(header), None).is_none());
///
/// // A different error code is not a step-up either.
/// let invalid = r#"Bearer error="invalid_token""#;
/// assert!(check_insufficient_scope(403, Some(invalid), None).is_none());
///
/// assert!(check_insufficient_scope(403, Some(header), None).is_some());
/// ```
pub fn check_insufficient_scope(
    status: u16,
    www_authenticate: Option<&str>,
    current_scopes: Option<&[String]>,
) -> Option<InsufficientScopeSignal> {
    if status != 403 {
        return None;
    }

    let challenge = parse_challenge(www_authenticate?)?;
    if challenge.error.as_deref() != Some(INSUFFICIENT_SCOPE) {
        return None;
    }

    // No scope attribute: nothing actionable to request.
    let raw_scope = challenge.scope?;

    Some(InsufficientScopeSignal {
        required_scopes: split_scopes(&raw_scope),
        current_scopes: current_scopes.map(|s| s.to_vec()),
        resource_metadata: challenge.resource_metadata,
        description: challenge.error_description,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
