//! OAuth client tests against a mockito token endpoint.

use mockito::Matcher;
use prayer_bot::oauth::{OAuthClient, OAuthError};
use prayer_bot::secrets::ClientSecret;

fn secret(token_uri: String) -> ClientSecret {
    ClientSecret {
        client_id: "client-123".to_string(),
        client_secret: "s3cret".to_string(),
        token_uri,
        project_id: None,
    }
}

fn form_matcher() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
        Matcher::UrlEncoded("client_id".into(), "client-123".into()),
        Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
    ])
}

/// **Test: a fresh token is requested once and then served from cache.**
#[tokio::test]
async fn test_token_is_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(form_matcher())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok-1","expires_in":3600,"token_type":"Bearer"}"#)
        .expect(1)
        .create_async()
        .await;
    let client = OAuthClient::new(reqwest::Client::new(), secret(format!("{}/token", server.url())));

    assert_eq!(client.access_token().await.unwrap(), "tok-1");
    assert_eq!(client.access_token().await.unwrap(), "tok-1");

    mock.assert_async().await;
}

/// **Test: tokens inside the refresh margin are refetched.**
///
/// **Setup:** Endpoint returns `expires_in: 10`, less than the 30s margin.
/// **Expected:** Every call hits the endpoint.
#[tokio::test]
async fn test_short_lived_token_is_refreshed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"short","expires_in":10}"#)
        .expect(2)
        .create_async()
        .await;
    let client = OAuthClient::new(reqwest::Client::new(), secret(format!("{}/token", server.url())));

    client.access_token().await.unwrap();
    client.access_token().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_invalidate_forces_new_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok"}"#)
        .expect(2)
        .create_async()
        .await;
    let client = OAuthClient::new(reqwest::Client::new(), secret(format!("{}/token", server.url())));

    client.access_token().await.unwrap();
    client.invalidate().await;
    client.access_token().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_scope_is_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded("scope".into(), "timetable.read".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"scoped"}"#)
        .create_async()
        .await;
    let client = OAuthClient::new(reqwest::Client::new(), secret(format!("{}/token", server.url())))
        .with_scope("timetable.read");

    assert_eq!(client.access_token().await.unwrap(), "scoped");
    mock.assert_async().await;
}

/// **Test: rejected credentials carry status and body.**
#[tokio::test]
async fn test_rejected_credentials() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(401)
        .with_body(r#"{"error":"invalid_client"}"#)
        .create_async()
        .await;
    let client = OAuthClient::new(reqwest::Client::new(), secret(format!("{}/token", server.url())));

    match client.access_token().await {
        Err(OAuthError::Rejected { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid_client"));
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_token_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token":"missing field"}"#)
        .create_async()
        .await;
    let client = OAuthClient::new(reqwest::Client::new(), secret(format!("{}/token", server.url())));

    assert!(matches!(client.access_token().await, Err(OAuthError::Parse(_))));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let client = OAuthClient::new(
        reqwest::Client::new(),
        secret("http://127.0.0.1:9/token".to_string()),
    );

    assert!(matches!(client.access_token().await, Err(OAuthError::Request(_))));
}
