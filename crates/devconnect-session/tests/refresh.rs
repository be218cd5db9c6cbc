//! Refresh-and-retry behavior of authenticated requests.

mod common;

use common::{post_json, user_json, TestApi};
use devconnect_session::{SessionError, SessionStatus};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_feed(api: &TestApi, token: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/posts/"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(response)
        .mount(&api.server)
        .await;
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_request_replayed() {
    let api = TestApi::start().await;
    let client = api.logged_in_client().await;

    mount_feed(&api, "A1", ResponseTemplate::new(401)).await;
    api.mount_refresh(
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })),
        1,
    )
    .await;
    mount_feed(
        &api,
        "A2",
        ResponseTemplate::new(200).set_body_json(json!([post_json(1, "bob", "hello")])),
    )
    .await;

    let posts = client.social().feed().await.unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content, "hello");
    assert_eq!(client.get_access_token().as_deref(), Some("A2"));
    assert_eq!(client.status(), SessionStatus::Authenticated);
    assert_eq!(
        api.stored_tokens(),
        (Some("A2".to_string()), Some("R1".to_string()))
    );
}

#[tokio::test]
async fn failed_refresh_ends_session() {
    let api = TestApi::start().await;
    let client = api.logged_in_client().await;

    mount_feed(&api, "A1", ResponseTemplate::new(401)).await;
    api.mount_refresh(
        "R1",
        ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid"
        })),
        1,
    )
    .await;

    let err = client.social().feed().await.unwrap_err();

    assert!(matches!(err, SessionError::AuthExpired));
    assert_eq!(
        err.user_message(),
        "Your session has expired. Please log in again."
    );
    assert_eq!(client.status(), SessionStatus::Unauthenticated);
    assert!(client.get_access_token().is_none());
    assert!(client.current_user().is_none());
    assert_eq!(api.stored_tokens(), (None, None));
}

#[tokio::test]
async fn replayed_request_never_refreshes_twice() {
    let api = TestApi::start().await;
    let client = api.logged_in_client().await;

    // Rejected with every token
    Mock::given(method("GET"))
        .and(path("/api/posts/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Authentication credentials were not provided."
        })))
        .expect(2)
        .mount(&api.server)
        .await;
    api.mount_refresh(
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })),
        1,
    )
    .await;

    let err = client.social().feed().await.unwrap_err();

    assert!(matches!(err, SessionError::Api { status: 401, .. }), "got {err:?}");
    // The refresh itself worked, so the session survives
    assert_eq!(client.status(), SessionStatus::Authenticated);
    assert_eq!(client.get_access_token().as_deref(), Some("A2"));
}

#[tokio::test]
async fn concurrent_rejections_share_one_refresh() {
    let api = TestApi::start().await;
    let client = api.logged_in_client().await;

    mount_feed(&api, "A1", ResponseTemplate::new(401)).await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/following/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&api.server)
        .await;
    api.mount_refresh(
        "R1",
        ResponseTemplate::new(200)
            .set_body_json(json!({ "access": "A2" }))
            .set_delay(Duration::from_millis(100)),
        1,
    )
    .await;
    mount_feed(
        &api,
        "A2",
        ResponseTemplate::new(200).set_body_json(json!([post_json(1, "bob", "hi")])),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me/following/"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_json(2, "bob")])))
        .mount(&api.server)
        .await;

    let social = client.social();
    let (feed, following) = tokio::join!(social.feed(), social.following());

    assert_eq!(feed.unwrap().len(), 1);
    assert_eq!(following.unwrap()[0].username, "bob");
    assert_eq!(client.get_access_token().as_deref(), Some("A2"));
}

#[tokio::test]
async fn rotated_refresh_token_is_persisted() {
    let api = TestApi::start().await;
    let client = api.logged_in_client().await;

    api.mount_refresh(
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "A2", "refresh": "R2" })),
        1,
    )
    .await;

    let access = client.refresh().await.unwrap();

    assert_eq!(access, "A2");
    assert_eq!(client.status(), SessionStatus::Authenticated);
    assert_eq!(
        api.stored_tokens(),
        (Some("A2".to_string()), Some("R2".to_string()))
    );
}

#[tokio::test]
async fn explicit_refresh_from_stored_refresh_token() {
    let api = TestApi::start().await;
    api.seed_tokens(None, Some("R1"));
    api.mount_refresh(
        "R1",
        ResponseTemplate::new(200).set_body_json(json!({ "access": "A2" })),
        1,
    )
    .await;
    api.mount_me("A2", user_json(1, "alice")).await;

    let client = api.client();
    assert_eq!(client.status(), SessionStatus::Unauthenticated);

    client.refresh().await.unwrap();

    assert_eq!(client.status(), SessionStatus::Authenticated);
    assert_eq!(client.current_user().unwrap().username, "alice");
    assert_eq!(client.get_access_token().as_deref(), Some("A2"));
}

#[tokio::test]
async fn get_access_token_never_refreshes() {
    let api = TestApi::start().await;
    let client = api.logged_in_client().await;
    api.mount_refresh("R1", ResponseTemplate::new(200), 0).await;

    assert_eq!(client.get_access_token().as_deref(), Some("A1"));
    assert_eq!(client.get_access_token().as_deref(), Some("A1"));
}
