//! `InstagramSource` driven through the engagement calculator against wiremock.

use engage_core::{Credentials, ProfileSource, SourceError};
use engage_instagram::{InstagramClient, InstagramSource, SessionCookies, SessionFile, SessionStore};
use engage_metrics::{calculate, CalculateError};
use serde_json::json;
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches timeline requests by the `after` cursor inside the `variables` JSON.
struct Cursor(Option<&'static str>);

impl Match for Cursor {
    fn matches(&self, request: &Request) -> bool {
        let Some((_, raw)) = request.url.query_pairs().find(|(k, _)| k == "variables") else {
            return false;
        };
        let vars: serde_json::Value = serde_json::from_str(&raw).unwrap_or_default();
        vars.get("after").and_then(serde_json::Value::as_str) == self.0
    }
}

fn test_client(base_url: &str) -> InstagramClient {
    InstagramClient::with_base_url(5, "engage-test/0.1", base_url)
        .expect("client construction should not fail")
}

fn node(id: &str, likes: Option<i64>, comments: Option<i64>) -> serde_json::Value {
    let mut node = json!({ "id": id, "shortcode": format!("sc{id}") });
    if let Some(likes) = likes {
        node["edge_media_preview_like"] = json!({ "count": likes });
    }
    if let Some(comments) = comments {
        node["edge_media_to_comment"] = json!({ "count": comments });
    }
    json!({ "node": node })
}

fn timeline(edges: Vec<serde_json::Value>, next: Option<&str>) -> serde_json::Value {
    json!({
        "data": {
            "user": {
                "edge_owner_to_timeline_media": {
                    "count": 100,
                    "page_info": { "has_next_page": next.is_some(), "end_cursor": next },
                    "edges": edges
                }
            }
        },
        "status": "ok"
    })
}

async fn mount_profile(server: &MockServer, followers: i64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "user": {
                "id": "42",
                "username": "someone",
                "edge_followed_by": { "count": followers }
            } }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn walks_pages_until_exhausted() {
    let server = MockServer::start().await;
    mount_profile(&server, 2_450_000).await;

    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .and(Cursor(None))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(
            vec![node("1", Some(100), Some(10)), node("2", Some(50), Some(5))],
            Some("page2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .and(Cursor(Some("page2")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(timeline(vec![node("3", Some(30), Some(0))], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = InstagramSource::anonymous(test_client(&server.uri()));
    let stats = calculate(&source, "@someone", 25)
        .await
        .expect("calculation should succeed");

    assert_eq!(stats.handle, "someone");
    assert_eq!(stats.processed_posts, 3);
    assert_eq!(stats.total_likes, 180);
    assert_eq!(stats.total_comments, 15);
    assert_eq!(stats.to_result().followers, "2.5M");
}

#[tokio::test]
async fn stops_paging_once_sample_is_full() {
    let server = MockServer::start().await;
    mount_profile(&server, 1_000).await;

    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .and(Cursor(None))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(
            vec![node("1", Some(1), Some(1)), node("2", Some(2), Some(2))],
            Some("page2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .and(Cursor(Some("page2")))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let source = InstagramSource::anonymous(test_client(&server.uri()));
    let stats = calculate(&source, "someone", 2).await.expect("should succeed");
    assert_eq!(stats.processed_posts, 2);
}

#[tokio::test]
async fn missing_counts_are_fetched_per_post_and_failures_skipped() {
    let server = MockServer::start().await;
    mount_profile(&server, 1_000).await;

    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(
            vec![
                node("1", None, Some(3)),
                node("2", Some(-1), Some(1)),
                node("3", Some(10), Some(0)),
            ],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/1/info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "like_count": 40, "comment_count": 99 }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/2/info/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let source = InstagramSource::anonymous(test_client(&server.uri()));
    let stats = calculate(&source, "someone", 25).await.expect("should succeed");

    assert_eq!(stats.processed_posts, 2);
    assert_eq!(stats.skipped_posts, 1);
    assert_eq!(stats.total_likes, 50);
    // The timeline's own comment count wins over the media record.
    assert_eq!(stats.total_comments, 3);
}

#[tokio::test]
async fn every_post_unreadable_is_no_posts_processed() {
    let server = MockServer::start().await;
    mount_profile(&server, 1_000).await;

    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(
            vec![node("1", None, None), node("2", None, None)],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/1/info/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/2/info/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = InstagramSource::anonymous(test_client(&server.uri()));
    let err = calculate(&source, "someone", 25).await.unwrap_err();
    assert!(
        matches!(err, CalculateError::NoPostsProcessed),
        "expected NoPostsProcessed, got: {err:?}"
    );
}

#[tokio::test]
async fn timeline_failure_is_a_lookup_error() {
    let server = MockServer::start().await;
    mount_profile(&server, 1_000).await;

    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = InstagramSource::anonymous(test_client(&server.uri()));
    let err = calculate(&source, "someone", 25).await.unwrap_err();
    assert!(
        matches!(err, CalculateError::Lookup(SourceError::RateLimited)),
        "expected Lookup(RateLimited), got: {err:?}"
    );
}

#[tokio::test]
async fn unknown_handle_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = InstagramSource::anonymous(test_client(&server.uri()));
    let err = source.resolve_profile("ghost").await.unwrap_err();
    assert!(
        matches!(err, SourceError::NotFound { ref handle } if handle == "ghost"),
        "expected NotFound(ghost), got: {err:?}"
    );
}

#[tokio::test]
async fn invalid_handle_is_rejected_without_a_request() {
    let server = MockServer::start().await;

    let source = InstagramSource::anonymous(test_client(&server.uri()));
    let err = source.resolve_profile("not a handle!").await.unwrap_err();

    assert!(matches!(err, SourceError::NotFound { .. }));
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty(), "no request should reach the platform");
}

// ---------------------------------------------------------------------------
// Authenticated variant
// ---------------------------------------------------------------------------

async fn mount_login(server: &MockServer, expected_logins: u64) {
    Mock::given(method("GET"))
        .and(path("/accounts/login/"))
        .respond_with(
            ResponseTemplate::new(200).append_header("set-cookie", "csrftoken=tok; Path=/"),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "sessionid=live; Path=/")
                .set_body_json(json!({ "authenticated": true, "user": true })),
        )
        .expect(expected_logins)
        .mount(server)
        .await;
}

fn credentials() -> Credentials {
    Credentials {
        username: "scout".to_string(),
        password: "hunter2".to_string(),
    }
}

#[tokio::test]
async fn logs_in_once_and_persists_session() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_profile(&server, 10).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());

    let source = InstagramSource::authenticated(
        test_client(&server.uri()),
        credentials(),
        store.clone(),
    );
    source.resolve_profile("someone").await.expect("first lookup");
    source.resolve_profile("someone").await.expect("second lookup");

    let saved = store
        .load("scout")
        .await
        .expect("readable")
        .expect("session saved after login");
    assert_eq!(saved.account, "scout");
    assert_eq!(saved.cookies.get("sessionid"), Some("live"));

    // A fresh process with the same store reuses the file instead of logging in.
    let restarted =
        InstagramSource::authenticated(test_client(&server.uri()), credentials(), store);
    restarted
        .resolve_profile("someone")
        .await
        .expect("lookup with stored session");
}

#[tokio::test]
async fn failed_login_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/login/"))
        .respond_with(
            ResponseTemplate::new(200).append_header("set-cookie", "csrftoken=tok; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "authenticated": false, "user": true })),
        )
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");

    let source = InstagramSource::authenticated(
        test_client(&server.uri()),
        credentials(),
        SessionStore::new(dir.path()),
    );
    let err = source.resolve_profile("someone").await.unwrap_err();

    assert!(
        matches!(err, SourceError::Auth(_)),
        "expected Auth, got: {err:?}"
    );
    assert!(!dir.path().join("session-scout.json").exists());
}

#[tokio::test]
async fn rejected_stored_session_is_discarded_and_replaced() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(header_regex("cookie", "sessionid=stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(header_regex("cookie", "sessionid=live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "user": {
                "id": "42",
                "username": "someone",
                "edge_followed_by": { "count": 10 }
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = SessionStore::new(dir.path());
    let mut stale = SessionCookies::default();
    stale.insert("sessionid", "stale");
    stale.insert("csrftoken", "old");
    store
        .save(&SessionFile {
            account: "scout".to_string(),
            saved_at: chrono::Utc::now(),
            cookies: stale,
        })
        .await
        .expect("seed stale session");

    let source = InstagramSource::authenticated(
        test_client(&server.uri()),
        credentials(),
        store.clone(),
    );

    let err = source.resolve_profile("someone").await.unwrap_err();
    assert!(
        matches!(err, SourceError::Auth(_)),
        "expected Auth, got: {err:?}"
    );
    assert!(
        store.load("scout").await.expect("readable").is_none(),
        "rejected session file should be deleted"
    );

    let profile = source
        .resolve_profile("someone")
        .await
        .expect("fresh login should recover");
    assert_eq!(profile.follower_count, 10);

    let saved = store
        .load("scout")
        .await
        .expect("readable")
        .expect("new session saved");
    assert_eq!(saved.cookies.get("sessionid"), Some("live"));
}
