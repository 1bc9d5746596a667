//! Metadata discovery integration tests using wiremock
//!
//! Verifies the behaviour of `src/discovery.rs`:
//!
//! - `fetch_authorization_server_metadata` tries the well-known candidate
//!   orderings in sequence and stops at the first candidate whose returned
//!   metadata validates against the expected issuer.
//! - Candidates with a mismatched `issuer` or empty
//!   `response_types_supported` are rejected and the next one is tried.
//! - Exhaustion produces an error listing every attempted URL.
//! - `fetch_protected_resource_metadata` tries path-insertion before the
//!   root well-known URI.
//! - `discover_resource_authorization` honours a `resource_metadata` URL in
//!   the `WWW-Authenticate` header and gives a header `scope` attribute
//!   precedence over the document's `scopes_supported`.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xzauth::discovery::{
    discover_resource_authorization, fetch_authorization_server_metadata,
    fetch_client_id_metadata_document, fetch_protected_resource_metadata,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns a valid authorization server metadata JSON body for `issuer`.
fn authorization_server_body(issuer: &str) -> serde_json::Value {
    serde_json::json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/authorize", issuer),
        "token_endpoint": format!("{}/token", issuer),
        "response_types_supported": ["code"],
        "code_challenge_methods_supported": ["S256"]
    })
}

/// Returns a valid protected resource metadata JSON body.
fn protected_resource_body(resource: &str, auth_server: &str) -> serde_json::Value {
    serde_json::json!({
        "resource": resource,
        "authorization_servers": [auth_server]
    })
}

// ---------------------------------------------------------------------------
// fetch_authorization_server_metadata: candidate ordering
// ---------------------------------------------------------------------------

/// For an issuer with a path, the three candidates are tried in order:
/// path-inserted oauth-authorization-server, path-inserted
/// openid-configuration, then path-appended openid-configuration.  The
/// fetch succeeds when only the third responds.
#[tokio::test]
async fn test_pathed_issuer_tries_three_orderings_in_sequence() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let issuer = url::Url::parse(&format!("{base_url}/tenant1")).unwrap();

    // Candidate 1: /.well-known/oauth-authorization-server/tenant1 -> 404
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server/tenant1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    // Candidate 2: /.well-known/openid-configuration/tenant1 -> 404
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration/tenant1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    // Candidate 3: /tenant1/.well-known/openid-configuration -> 200
    Mock::given(method("GET"))
        .and(path("/tenant1/.well-known/openid-configuration"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(authorization_server_body(&format!("{base_url}/tenant1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_authorization_server_metadata(&http, &issuer).await;

    assert!(
        result.is_ok(),
        "must succeed on the path-appended candidate, got: {:?}",
        result.err()
    );
    let meta = result.unwrap();
    assert!(meta.token_endpoint.ends_with("/token"));
}

/// The first candidate wins when it responds with valid metadata; the
/// later candidates are never requested.
#[tokio::test]
async fn test_first_candidate_short_circuits() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let issuer = url::Url::parse(&format!("{base_url}/tenant1")).unwrap();

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server/tenant1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(authorization_server_body(&format!("{base_url}/tenant1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    // The second candidate must never be hit.
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration/tenant1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_authorization_server_metadata(&http, &issuer).await;
    assert!(result.is_ok(), "got: {:?}", result.err());
}

/// A root issuer tries only the two origin-level candidates.
#[tokio::test]
async fn test_root_issuer_falls_back_to_openid_configuration() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let issuer = url::Url::parse(&base_url).unwrap();

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(authorization_server_body(&base_url)))
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_authorization_server_metadata(&http, &issuer).await;
    assert!(result.is_ok(), "got: {:?}", result.err());
}

// ---------------------------------------------------------------------------
// fetch_authorization_server_metadata: validation
// ---------------------------------------------------------------------------

/// A candidate whose metadata reports a different issuer is rejected and
/// the next candidate is tried.
#[tokio::test]
async fn test_issuer_mismatch_rejects_candidate_and_tries_next() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let issuer = url::Url::parse(&format!("{base_url}/tenant1")).unwrap();

    // Candidate 1 claims to be a different tenant: rejected.
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server/tenant1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(authorization_server_body(&format!("{base_url}/tenant2"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Candidate 2 reports the right issuer: accepted.
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration/tenant1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(authorization_server_body(&format!("{base_url}/tenant1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_authorization_server_metadata(&http, &issuer).await;

    assert!(
        result.is_ok(),
        "must skip the mismatched candidate and accept the next, got: {:?}",
        result.err()
    );
    let meta = result.unwrap();
    assert!(
        meta.issuer.ends_with("/tenant1"),
        "accepted metadata must carry the expected issuer: {}",
        meta.issuer
    );
}

/// Metadata with an empty `response_types_supported` list is rejected.
#[tokio::test]
async fn test_empty_response_types_rejects_candidate() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let issuer = url::Url::parse(&base_url).unwrap();

    let mut body = authorization_server_body(&base_url);
    body["response_types_supported"] = serde_json::json!([]);

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_authorization_server_metadata(&http, &issuer).await;

    assert!(result.is_err(), "empty response_types_supported must reject");
    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("response_types_supported"),
        "error should name the rejected field: {msg}"
    );
}

/// Exhausting every candidate produces an error listing all attempted
/// URLs.
#[tokio::test]
async fn test_exhaustion_error_lists_all_attempted_urls() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let issuer = url::Url::parse(&format!("{base_url}/tenant1")).unwrap();

    // Nothing mounted: every candidate 404s.
    let http = reqwest::Client::new();
    let result = fetch_authorization_server_metadata(&http, &issuer).await;

    assert!(result.is_err());
    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("/.well-known/oauth-authorization-server/tenant1"),
        "error must list the first candidate: {msg}"
    );
    assert!(
        msg.contains("/.well-known/openid-configuration/tenant1"),
        "error must list the second candidate: {msg}"
    );
    assert!(
        msg.contains("/tenant1/.well-known/openid-configuration"),
        "error must list the third candidate: {msg}"
    );
}

// ---------------------------------------------------------------------------
// fetch_protected_resource_metadata
// ---------------------------------------------------------------------------

/// A resource with a non-root path tries the path-inserted well-known URI
/// first.
#[tokio::test]
async fn test_protected_resource_path_insertion_tried_first() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let resource = url::Url::parse(&format!("{base_url}/api/v2")).unwrap();

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource/api/v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(protected_resource_body(
            &format!("{base_url}/api/v2"),
            &base_url,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_protected_resource_metadata(&http, &resource).await;

    assert!(result.is_ok(), "got: {:?}", result.err());
    assert_eq!(result.unwrap().authorization_servers, vec![base_url]);
}

/// The root well-known URI is always attempted as a fallback when the
/// path-inserted form fails.
#[tokio::test]
async fn test_protected_resource_falls_back_to_root_well_known() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let resource = url::Url::parse(&format!("{base_url}/api/v2")).unwrap();

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource/api/v2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(protected_resource_body(&base_url, &base_url)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_protected_resource_metadata(&http, &resource).await;
    assert!(result.is_ok(), "got: {:?}", result.err());
}

/// A document with an empty `authorization_servers` list is invalid.
#[tokio::test]
async fn test_protected_resource_empty_authorization_servers_rejected() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let resource = url::Url::parse(&base_url).unwrap();

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resource": base_url,
            "authorization_servers": []
        })))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = fetch_protected_resource_metadata(&http, &resource).await;

    assert!(result.is_err());
    let msg = result.unwrap_err().to_string();
    assert!(
        msg.contains("no authorization servers"),
        "error should explain the rejection: {msg}"
    );
}

// ---------------------------------------------------------------------------
// discover_resource_authorization
// ---------------------------------------------------------------------------

/// A `resource_metadata` URL in the challenge header is fetched directly;
/// the well-known URIs are never constructed.
#[tokio::test]
async fn test_challenge_metadata_url_skips_well_known_construction() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let resource = url::Url::parse(&base_url).unwrap();

    Mock::given(method("GET"))
        .and(path("/custom/metadata/location"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(protected_resource_body(&base_url, &base_url)),
        )
        .expect(1)
        .mount(&server)
        .await;

    // The well-known fallback must never be hit.
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let header = format!(r#"Bearer resource_metadata="{base_url}/custom/metadata/location""#);
    let http = reqwest::Client::new();
    let result = discover_resource_authorization(&http, &resource, Some(&header)).await;

    assert!(result.is_ok(), "got: {:?}", result.err());
    assert_eq!(result.unwrap().authorization_servers, vec![base_url]);
}

/// A `scope` attribute in the challenge header takes precedence over the
/// document's `scopes_supported`.
#[tokio::test]
async fn test_challenge_scope_overrides_metadata_scopes() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let resource = url::Url::parse(&base_url).unwrap();

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resource": base_url,
            "authorization_servers": [base_url],
            "scopes_supported": ["metadata_scope"]
        })))
        .mount(&server)
        .await;

    let header = r#"Bearer scope="header_scope_a header_scope_b""#;
    let http = reqwest::Client::new();
    let result = discover_resource_authorization(&http, &resource, Some(header)).await;

    assert!(result.is_ok(), "got: {:?}", result.err());
    let auth = result.unwrap();
    assert_eq!(
        auth.scopes,
        Some(vec![
            "header_scope_a".to_string(),
            "header_scope_b".to_string()
        ]),
        "header scope must win over scopes_supported"
    );
}

/// Without a header scope, the document's `scopes_supported` flows
/// through.
#[tokio::test]
async fn test_metadata_scopes_used_when_header_has_no_scope() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let resource = url::Url::parse(&base_url).unwrap();

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resource": base_url,
            "authorization_servers": [base_url],
            "scopes_supported": ["metadata_scope"]
        })))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let result = discover_resource_authorization(&http, &resource, None).await;

    assert!(result.is_ok(), "got: {:?}", result.err());
    assert_eq!(
        result.unwrap().scopes,
        Some(vec!["metadata_scope".to_string()])
    );
}

// ---------------------------------------------------------------------------
// fetch_client_id_metadata_document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_fetch_client_id_metadata_document() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/client-metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "client_id": format!("{base_url}/.well-known/client-metadata"),
            "client_name": "Example App",
            "redirect_uris": ["http://127.0.0.1:8734/callback"],
            "token_endpoint_auth_method": "none"
        })))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let doc_url = url::Url::parse(&format!("{base_url}/.well-known/client-metadata")).unwrap();
    let result = fetch_client_id_metadata_document(&http, &doc_url).await;

    assert!(result.is_ok(), "got: {:?}", result.err());
    let doc = result.unwrap();
    assert_eq!(doc.client_name, "Example App");
    assert_eq!(doc.token_endpoint_auth_method, Some("none".to_string()));
}

#[tokio::test]
async fn test_fetch_client_id_metadata_document_404_is_error() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    let http = reqwest::Client::new();
    let doc_url = url::Url::parse(&format!("{base_url}/.well-known/client-metadata")).unwrap();
    let result = fetch_client_id_metadata_document(&http, &doc_url).await;

    assert!(result.is_err());
}
