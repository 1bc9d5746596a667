//! `WWW-Authenticate` Bearer challenge parsing
//!
//! A resource server that rejects a request attaches a `WWW-Authenticate`
//! header describing how to authenticate (RFC 6750 section 3).  This module
//! parses the `Bearer` form of that header into a structured
//! [`AuthChallenge`] used by challenge-driven discovery
//! ([`crate::discovery`]) and step-up detection ([`crate::step_up`]).
//!
//! Parsing is deliberately forgiving: any header that is not a Bearer
//! challenge, including an empty or malformed one, yields `None` rather
//! than an error.

/// A parsed `WWW-Authenticate: Bearer ...` challenge.
///
/// Only the attributes this core acts on are modelled; unrecognized
/// attributes (such as `realm`) are ignored during parsing.
///
/// # Examples
///
/// ```
/// use xzauth::challenge::parse_challenge;
///
/// let header = r#"Bearer error="insufficient_scope", scope="read write admin""#;
/// let challenge = parse_challenge(header).expect("Bearer header must parse");
/// assert_eq!(challenge.error.as_deref(), Some("insufficient_scope"));
/// assert_eq!(challenge.scope.as_deref(), Some("read write admin"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthChallenge {
    /// URL of the protected resource metadata document (RFC 9728), when
    /// the server advertises one.
    pub resource_metadata: Option<String>,

    /// Space-delimited scope string the server says is needed.
    pub scope: Option<String>,

    /// OAuth error code, e.g. `invalid_token` or `insufficient_scope`.
    pub error: Option<String>,

    /// Human-readable error description, passed through for diagnostics.
    pub error_description: Option<String>,
}

/// Parses a `WWW-Authenticate` header value into an [`AuthChallenge`].
///
/// Recognizes only the `Bearer` scheme (case-insensitive); any other
/// scheme, or an empty header, yields `None`.  Attributes are
/// comma-separated `key=value` pairs where the value is either
/// double-quoted (quotes stripped) or a bare token running to the next
/// comma or whitespace.  Recognized keys are `resource_metadata`, `scope`,
/// `error`, and `error_description`; everything else is ignored.
///
/// A bare `Bearer` with no attributes is still a challenge; the returned
/// struct simply has every field unset.
///
/// # Examples
///
/// ```
/// use xzauth::challenge::parse_challenge;
///
/// // Non-Bearer schemes are not auth challenges for this core.
/// assert!(parse_challenge(r#"Basic realm="files""#).is_none());
/// assert!(parse_challenge("").is_none());
///
/// let challenge = parse_challenge("Bearer error=invalid_token").unwrap();
/// assert_eq!(challenge.error.as_deref(), Some("invalid_token"));
/// ```
pub fn parse_challenge(header: &str) -> Option<AuthChallenge> {
    let trimmed = header.trim();
    if trimmed.is_empty() {
        return None;
    }

    // The scheme is the first whitespace-delimited token.
    let (scheme, params) = match trimmed.split_once(char::is_whitespace) {
        Some((scheme, rest)) => (scheme, rest),
        None => (trimmed, ""),
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }

    let mut challenge = AuthChallenge::default();
    for (key, value) in parse_auth_params(params) {
        match key.as_str() {
            "resource_metadata" => challenge.resource_metadata = Some(value),
            "scope" => challenge.scope = Some(value),
            "error" => challenge.error = Some(value),
            "error_description" => challenge.error_description = Some(value),
            _ => {}
        }
    }

    Some(challenge)
}

/// Scans comma-separated `key=value` auth params.
///
/// Quoted values may contain commas and whitespace; bare values run to the
/// next comma or whitespace.  A trailing fragment without `=` is dropped.
fn parse_auth_params(mut rest: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = rest[..eq].trim().to_string();
        rest = &rest[eq + 1..];

        let value = if let Some(inner) = rest.strip_prefix('"') {
            match inner.find('"') {
                Some(end) => {
                    let value = inner[..end].to_string();
                    rest = &inner[end + 1..];
                    value
                }
                None => {
                    // Unterminated quote: take the remainder.
                    let value = inner.to_string();
                    rest = "";
                    value
                }
            }
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == ',')
                .unwrap_or(rest.len());
            let value = rest[..end].to_string();
            rest = &rest[end..];
            value
        };

        if !key.is_empty() {
            params.push((key, value));
        }
    }

    params
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
