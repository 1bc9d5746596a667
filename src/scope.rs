//! Scope negotiation policy
//!
//! Decides which OAuth scopes to request for an authorization attempt given
//! up to three inputs, in strict priority order:
//!
//! 1. the `scope` attribute from a `WWW-Authenticate` challenge,
//! 2. the `scopes_supported` list from discovered metadata,
//! 3. the statically configured scope list.
//!
//! When none apply, the authorization request omits the `scope` parameter
//! entirely; an empty scope string is never sent.

/// Splits a space-delimited scope string into individual scope values.
///
/// Empty tokens are dropped.
///
/// # Examples
///
/// ```
/// use xzauth::scope::split_scopes;
///
/// assert_eq!(split_scopes("read  write"), vec!["read", "write"]);
/// assert!(split_scopes("   ").is_empty());
/// ```
pub fn split_scopes(raw: &str) -> Vec<String> {
    raw.split_whitespace()
        .filter(|scope| !scope.is_empty())
        .map(String::from)
        .collect()
}

/// Selects the scope list for an authorization request.
///
/// Evaluated in strict priority order:
///
/// 1. A challenge scope string, when present, always wins: it is split on
///    whitespace with empty tokens dropped, and the filtered list is
///    returned even when it ends up empty (the server explicitly stated a
///    scope attribute, so the decision is made).
/// 2. Otherwise a non-empty discovered `scopes_supported` list is returned
///    verbatim.
/// 3. Otherwise a non-empty statically configured list is returned
///    verbatim.
/// 4. Otherwise `None`: the caller must omit the `scope` parameter.
///
/// # Examples
///
/// ```
/// use xzauth::scope::select_scopes;
///
/// let discovered = vec!["admin".to_string(), "user".to_string()];
/// let configured = vec!["default".to_string()];
///
/// assert_eq!(
///     select_scopes(Some("read write"), Some(&discovered), Some(&configured)),
///     Some(vec!["read".to_string(), "write".to_string()]),
/// );
/// assert_eq!(
///     select_scopes(None, Some(&discovered), Some(&configured)),
///     Some(discovered.clone()),
/// );
/// assert_eq!(
///     select_scopes(None, None, Some(&configured)),
///     Some(configured.clone()),
/// );
/// assert_eq!(select_scopes(None, None, None), None);
/// ```
pub fn select_scopes(
    challenge_scope: Option<&str>,
    discovered: Option<&[String]>,
    configured: Option<&[String]>,
) -> Option<Vec<String>> {
    if let Some(raw) = challenge_scope {
        return Some(split_scopes(raw));
    }

    if let Some(list) = discovered {
        if !list.is_empty() {
            return Some(list.to_vec());
        }
    }

    if let Some(list) = configured {
        if !list.is_empty() {
            return Some(list.to_vec());
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
