//! PKCE S256 challenge generation and verification
//!
//! This module implements the Proof Key for Code Exchange (PKCE) extension
//! to OAuth 2.0 as defined in RFC 7636, specifically the `S256` challenge
//! method mandated by OAuth 2.1.
//!
//! # How PKCE works
//!
//! 1. The client generates a high-entropy random string called the
//!    `code_verifier`.
//! 2. The client computes a SHA-256 hash of the verifier and
//!    base64url-encodes it to produce the `code_challenge`.
//! 3. The authorization request includes `code_challenge` and
//!    `code_challenge_method=S256`.
//! 4. The token exchange request includes the original `code_verifier`.
//! 5. The authorization server recomputes the challenge and compares it to
//!    the value sent in step 3, proving possession of the verifier.
//!
//! The challenge is derived exactly once, at generation time; the verifier
//! is later sent raw to the token endpoint and the server redoes the hash.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>
//! - OAuth 2.1 draft <https://datatracker.ietf.org/doc/draft-ietf-oauth-v2-1/>

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::discovery::AuthorizationServerMetadata;
use crate::error::{AuthError, Result};

/// Length of a generated `code_verifier` in characters: the RFC 7636
/// minimum, equivalent to 32 bytes of entropy in unpadded base64url.
pub const VERIFIER_LENGTH: usize = 43;

/// Length of a generated `state` nonce in characters (16 bytes of entropy).
pub const STATE_LENGTH: usize = 22;

// ---------------------------------------------------------------------------
// PkceState
// ---------------------------------------------------------------------------

/// A single in-flight authorization attempt.
///
/// Bundles the CSRF `state` nonce with the PKCE verifier/challenge pair and
/// the creation timestamp.  Created by [`PkceState::new`], held by the
/// [`AuthManager`](crate::manager::AuthManager) as the one pending attempt,
/// and consumed (read-once) when the redirect callback is processed.
///
/// Invariant: `code_challenge == base64url(SHA256(code_verifier))` holds at
/// generation time and is never recomputed afterwards.
///
/// # Examples
///
/// ```
/// use xzauth::pkce::{code_challenge, PkceState, VERIFIER_LENGTH};
///
/// let pkce = PkceState::new();
/// assert_eq!(pkce.code_verifier.len(), VERIFIER_LENGTH);
/// assert_eq!(pkce.code_challenge, code_challenge(&pkce.code_verifier));
/// ```
#[derive(Debug, Clone)]
pub struct PkceState {
    /// Opaque CSRF nonce echoed back by the authorization server in the
    /// redirect.  Validated by
    /// [`AuthManager::complete_flow`](crate::manager::AuthManager::complete_flow).
    pub state: String,

    /// The code verifier: an unpadded base64url random string of
    /// [`VERIFIER_LENGTH`] characters, sent to the token endpoint in the
    /// `code_verifier` parameter during the code exchange.
    pub code_verifier: String,

    /// The code challenge: the unpadded base64url SHA-256 digest of the
    /// UTF-8 representation of [`Self::code_verifier`], sent to the
    /// authorization endpoint in the `code_challenge` parameter.
    pub code_challenge: String,

    /// When this attempt was generated.
    pub created_at: DateTime<Utc>,
}

impl PkceState {
    /// Generates a fresh authorization attempt.
    ///
    /// Combines a random `state`, a random verifier, and its derived
    /// challenge, stamped with the current time.  No two calls produce the
    /// same `state` or `code_verifier` with overwhelming probability.
    ///
    /// # Examples
    ///
    /// ```
    /// use xzauth::pkce::PkceState;
    ///
    /// let a = PkceState::new();
    /// let b = PkceState::new();
    /// assert_ne!(a.state, b.state);
    /// assert_ne!(a.code_verifier, b.code_verifier);
    /// ```
    pub fn new() -> Self {
        let code_verifier = random_token(VERIFIER_LENGTH);
        let code_challenge = code_challenge(&code_verifier);
        Self {
            state: random_token(STATE_LENGTH),
            code_verifier,
            code_challenge,
            created_at: Utc::now(),
        }
    }
}

impl Default for PkceState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Generates a cryptographically random URL-safe token.
///
/// Draws `length` characters worth of entropy from the operating system
/// CSPRNG and encodes them with the unpadded base64url alphabet, so the
/// result is safe to place in URLs and form bodies without escaping.  This
/// must never be swapped for a general-purpose non-cryptographic generator;
/// both the PKCE verifier and the CSRF `state` nonce are security tokens.
///
/// # Arguments
///
/// * `length` - Number of characters to produce.  Use [`VERIFIER_LENGTH`]
///   for code verifiers (the RFC 7636 minimum).
///
/// # Examples
///
/// ```
/// use xzauth::pkce::random_token;
///
/// let token = random_token(43);
/// assert_eq!(token.len(), 43);
/// assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
/// ```
pub fn random_token(length: usize) -> String {
    use rand::RngCore as _;

    // Enough random bytes that the unpadded base64url encoding covers the
    // requested length: n bytes encode to ceil(4n/3) characters.
    let mut bytes = vec![0u8; (length * 3 + 3) / 4];
    rand::rng().fill_bytes(&mut bytes);

    let mut token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes);
    token.truncate(length);
    token
}

/// Computes the S256 code challenge for a verifier.
///
/// Deterministic: the same verifier always yields the same challenge.  The
/// digest is computed over the UTF-8 bytes of the verifier string, per
/// RFC 7636 section 4.2:
/// `ASCII(BASE64URL(SHA256(ASCII(code_verifier))))`.
///
/// # Examples
///
/// ```
/// use xzauth::pkce::code_challenge;
///
/// // RFC 7636 Appendix B test vector.
/// assert_eq!(
///     code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
/// );
/// ```
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

/// Verifies that the authorization server supports the PKCE `S256` method.
///
/// If the server's metadata does not advertise
/// `code_challenge_methods_supported` at all, or the list does not contain
/// `"S256"`, this function returns [`AuthError::PkceUnsupported`].  OAuth
/// 2.1 mandates PKCE for all public clients; refusing to proceed without
/// `S256` support is the correct security posture, and falling back to the
/// deprecated `plain` method is never acceptable.
///
/// # Errors
///
/// Returns [`AuthError::PkceUnsupported`] naming the issuer when `S256` is
/// absent from `code_challenge_methods_supported` or the field is missing
/// entirely.
pub fn ensure_s256_support(metadata: &AuthorizationServerMetadata) -> Result<()> {
    let supported = metadata
        .code_challenge_methods_supported
        .as_deref()
        .unwrap_or(&[]);

    if supported.iter().any(|m| m == "S256") {
        Ok(())
    } else {
        Err(AuthError::PkceUnsupported(metadata.issuer.clone()).into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
