//! End-to-end tests driving the real router over an in-memory database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use threadline_api::enrich::Enricher;
use threadline_api::media::{LocalMedia, MediaHost};
use threadline_api::{AppState, AppStateInner, router};
use threadline_db::Database;
use threadline_gateway::Dispatcher;
use threadline_types::events::GatewayEvent;
use threadline_types::models::Message;

struct TestApp {
    state: AppState,
    router: Router,
    _media: TempDir,
}

struct Session {
    id: Uuid,
    token: String,
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            jwt_secret: "test-secret".into(),
            dispatcher: Dispatcher::new(),
            media: MediaHost::Local(LocalMedia::new(media.path(), "http://localhost:5000")),
            enricher: Arc::new(Enricher::disabled()),
            cookie_secure: false,
        });
        Self {
            router: router(state.clone()),
            state,
            _media: media,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("jwt={}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> Reply {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        Reply {
            status,
            set_cookie,
            body,
        }
    }

    async fn signup(&self, username: &str) -> Session {
        let reply = self
            .call(
                Method::POST,
                "/api/users/signup",
                None,
                Some(json!({
                    "name": username,
                    "email": format!("{username}@example.com"),
                    "username": username,
                    "password": "password123",
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

        Session {
            id: reply.body["id"].as_str().unwrap().parse().unwrap(),
            token: cookie_token(reply.set_cookie.as_deref().unwrap()),
        }
    }

    async fn post(&self, author: &Session, text: &str) -> String {
        let reply = self
            .call(
                Method::POST,
                "/api/posts",
                Some(&author.token),
                Some(json!({ "postedBy": author.id, "text": text })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["id"].as_str().unwrap().to_string()
    }
}

/// A WebSocket handshake request for the gateway, carrying the session
/// cookie when given.
fn gateway_request(query: &str, token: Option<&str>) -> Request<Body> {
    let mut req = Request::builder()
        .method(Method::GET)
        .uri(format!("/gateway{}", query))
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==");
    if let Some(token) = token {
        req = req.header(header::COOKIE, format!("jwt={}", token));
    }
    req.body(Body::empty()).unwrap()
}

fn cookie_token(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("jwt="))
        .unwrap()
        .to_string()
}

fn ids(posts: &Value) -> Vec<String> {
    posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn signup_sets_session_and_rejects_duplicates() {
    let app = TestApp::new();

    let reply = app
        .call(
            Method::POST,
            "/api/users/signup",
            None,
            Some(json!({
                "name": "Alice",
                "email": "alice@example.com",
                "username": "alice",
                "password": "password123",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["username"], "alice");
    assert!(reply.body.get("password").is_none());
    let cookie = reply.set_cookie.unwrap();
    assert!(cookie.starts_with("jwt="));
    assert!(cookie.contains("HttpOnly"));

    let duplicate = app
        .call(
            Method::POST,
            "/api/users/signup",
            None,
            Some(json!({
                "name": "Other",
                "email": "alice@example.com",
                "username": "someone-else",
                "password": "password123",
            })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["error"], "User already exists");

    let missing = app
        .call(
            Method::POST,
            "/api/users/signup",
            None,
            Some(json!({ "username": "bob", "password": "password123" })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "Please fill in all fields");
}

#[tokio::test]
async fn login_checks_password_and_logout_clears_cookie() {
    let app = TestApp::new();
    app.signup("alice").await;

    let bad = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.body["error"], "Invalid username or password");

    let by_email = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(by_email.status, StatusCode::OK);
    assert_eq!(by_email.body["username"], "alice");
    let token = cookie_token(by_email.set_cookie.as_deref().unwrap());
    assert!(!token.is_empty());

    let logout = app
        .call(Method::POST, "/api/users/logout", Some(&token), None)
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.set_cookie.unwrap().starts_with("jwt=;"));
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = TestApp::new();

    let anonymous = app.call(Method::GET, "/api/posts/feed", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forged = app
        .call(Method::GET, "/api/posts/feed", Some("not-a-jwt"), None)
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert!(forged.body["error"].is_string());
}

#[tokio::test]
async fn bearer_header_authenticates_without_cookie() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;

    let req = Request::builder()
        .method(Method::GET)
        .uri("/api/posts/feed")
        .header(header::AUTHORIZATION, format!("Bearer {}", alice.token))
        .body(Body::empty())
        .unwrap();
    let reply = app.send(req).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert!(reply.body.is_array());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_signups_are_rejected_cleanly() {
    for _ in 0..10 {
        let app = TestApp::new();
        let attempt = || {
            app.call(
                Method::POST,
                "/api/users/signup",
                None,
                Some(json!({
                    "name": "Dup",
                    "email": "dup@example.com",
                    "username": "dup",
                    "password": "password123",
                })),
            )
        };
        let (a, b, c, d) = tokio::join!(attempt(), attempt(), attempt(), attempt());

        let replies = [a, b, c, d];
        let created = replies.iter().filter(|r| r.status == StatusCode::CREATED).count();
        assert_eq!(created, 1);
        for reply in replies.iter().filter(|r| r.status != StatusCode::CREATED) {
            assert_eq!(reply.status, StatusCode::BAD_REQUEST);
            assert_eq!(reply.body["error"], "User already exists");
        }
    }
}

#[tokio::test]
async fn password_length_counts_characters() {
    let app = TestApp::new();

    let reply = app
        .call(
            Method::POST,
            "/api/users/signup",
            None,
            Some(json!({
                "name": "Zoe",
                "email": "zoe@example.com",
                "username": "zoe",
                "password": "ééééé",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Password must be at least 6 characters");
}

#[tokio::test]
async fn gateway_requires_a_session() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;

    let anonymous = app
        .send(gateway_request(&format!("?userId={}", alice.id), None))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forged = app.send(gateway_request("", Some("not-a-jwt"))).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gateway_rejects_a_mismatched_user_id() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let reply = app
        .send(gateway_request(&format!("?userId={}", bob.id), Some(&alice.token)))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Gateway user does not match session");

    let garbage = app
        .send(gateway_request("?userId=someone", Some(&alice.token)))
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gateway_accepts_matching_or_absent_user_id() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;

    // Identity checks pass; the in-process request has no connection to
    // upgrade, so the handshake itself stops at 426.
    for query in [
        format!("?userId={}", alice.id),
        "?userId=undefined".to_string(),
        "?userId=".to_string(),
        String::new(),
    ] {
        let reply = app.send(gateway_request(&query, Some(&alice.token))).await;
        assert_eq!(reply.status, StatusCode::UPGRADE_REQUIRED, "query {:?}", query);
    }
}

#[tokio::test]
async fn profile_by_id_or_username() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;

    let by_name = app.call(Method::GET, "/api/users/profile/alice", None, None).await;
    assert_eq!(by_name.status, StatusCode::OK);
    assert_eq!(by_name.body["id"], alice.id.to_string());

    let by_id = app
        .call(Method::GET, &format!("/api/users/profile/{}", alice.id), None, None)
        .await;
    assert_eq!(by_id.body["username"], "alice");

    let missing = app.call(Method::GET, "/api/users/profile/nobody", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"], "User not found");
}

#[tokio::test]
async fn post_validation() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let too_long = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&alice.token),
            Some(json!({ "postedBy": alice.id, "text": "x".repeat(501) })),
        )
        .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);

    let as_someone_else = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&alice.token),
            Some(json!({ "postedBy": bob.id, "text": "hi" })),
        )
        .await;
    assert_eq!(as_someone_else.status, StatusCode::UNAUTHORIZED);

    let unknown_author = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&alice.token),
            Some(json!({ "postedBy": Uuid::new_v4(), "text": "hi" })),
        )
        .await;
    assert_eq!(unknown_author.status, StatusCode::NOT_FOUND);

    let no_text = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&alice.token),
            Some(json!({ "postedBy": alice.id })),
        )
        .await;
    assert_eq!(no_text.status, StatusCode::BAD_REQUEST);

    let exactly_max = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&alice.token),
            Some(json!({ "postedBy": alice.id, "text": "é".repeat(500) })),
        )
        .await;
    assert_eq!(exactly_max.status, StatusCode::CREATED);
}

#[tokio::test]
async fn post_with_image_is_stored_locally() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;

    let pixel = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";
    let created = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&alice.token),
            Some(json!({ "postedBy": alice.id, "text": "look", "img": pixel })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let img = created.body["img"].as_str().unwrap();
    assert!(img.starts_with("http://localhost:5000/media/"));

    let bad_image = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&alice.token),
            Some(json!({ "postedBy": alice.id, "text": "look", "img": "not-an-image" })),
        )
        .await;
    assert_eq!(bad_image.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_author_can_delete_a_post() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let post_id = app.post(&alice, "hello").await;

    let uri = format!("/api/posts/{}", post_id);
    let by_bob = app.call(Method::DELETE, &uri, Some(&bob.token), None).await;
    assert_eq!(by_bob.status, StatusCode::UNAUTHORIZED);

    let by_alice = app.call(Method::DELETE, &uri, Some(&alice.token), None).await;
    assert_eq!(by_alice.status, StatusCode::OK);

    let gone = app.call(Method::GET, &uri, None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let feed = app.call(Method::GET, "/api/posts/feed", Some(&bob.token), None).await;
    assert!(ids(&feed.body).is_empty());
    let profile = app.call(Method::GET, "/api/posts/user/alice", None, None).await;
    assert!(ids(&profile.body).is_empty());

    let again = app.call(Method::DELETE, &uri, Some(&alice.token), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn liking_twice_restores_the_post() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let post_id = app.post(&alice, "like me").await;
    let like_uri = format!("/api/posts/{}/like", post_id);

    let first = app.call(Method::POST, &like_uri, Some(&bob.token), None).await;
    assert_eq!(first.body["liked"], true);
    let post = app.call(Method::GET, &format!("/api/posts/{}", post_id), None, None).await;
    assert_eq!(post.body["likes"], json!([bob.id]));

    let second = app.call(Method::POST, &like_uri, Some(&bob.token), None).await;
    assert_eq!(second.body["liked"], false);
    let post = app.call(Method::GET, &format!("/api/posts/{}", post_id), None, None).await;
    assert_eq!(post.body["likes"], json!([]));

    let missing = app
        .call(
            Method::POST,
            &format!("/api/posts/{}/like", Uuid::new_v4()),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_then_unfollow_restores_both_lists() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let follow_uri = format!("/api/users/follow/{}", bob.id);

    let followed = app.call(Method::POST, &follow_uri, Some(&alice.token), None).await;
    assert_eq!(followed.status, StatusCode::OK);
    assert_eq!(followed.body["following"], true);

    let bob_profile = app.call(Method::GET, "/api/users/profile/bob", None, None).await;
    assert_eq!(bob_profile.body["followers"], json!([alice.id]));
    let alice_profile = app.call(Method::GET, "/api/users/profile/alice", None, None).await;
    assert_eq!(alice_profile.body["following"], json!([bob.id]));

    let unfollowed = app.call(Method::POST, &follow_uri, Some(&alice.token), None).await;
    assert_eq!(unfollowed.body["following"], false);

    let bob_profile = app.call(Method::GET, "/api/users/profile/bob", None, None).await;
    assert_eq!(bob_profile.body["followers"], json!([]));
    let alice_profile = app.call(Method::GET, "/api/users/profile/alice", None, None).await;
    assert_eq!(alice_profile.body["following"], json!([]));

    let self_follow = app
        .call(
            Method::POST,
            &format!("/api/users/follow/{}", alice.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(self_follow.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_lists_followed_authors_first() {
    let app = TestApp::new();
    let reader = app.signup("reader").await;
    let friend = app.signup("friend").await;
    let stranger = app.signup("stranger").await;

    app.call(
        Method::POST,
        &format!("/api/users/follow/{}", friend.id),
        Some(&reader.token),
        None,
    )
    .await;

    let friend_old = app.post(&friend, "friend old").await;
    let stranger_post = app.post(&stranger, "stranger").await;
    let own = app.post(&reader, "mine").await;
    let friend_new = app.post(&friend, "friend new").await;

    let feed = app.call(Method::GET, "/api/posts/feed", Some(&reader.token), None).await;
    assert_eq!(feed.status, StatusCode::OK);
    assert_eq!(ids(&feed.body), vec![friend_new, friend_old, own, stranger_post]);
}

#[tokio::test]
async fn profile_update_patches_reply_snapshots() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let post_id = app.post(&alice, "thoughts?").await;

    let replied = app
        .call(
            Method::POST,
            &format!("/api/posts/{}/reply", post_id),
            Some(&bob.token),
            Some(json!({ "text": "agreed" })),
        )
        .await;
    assert_eq!(replied.status, StatusCode::OK);
    assert_eq!(replied.body["username"], "bob");

    let not_mine = app
        .call(
            Method::PUT,
            &format!("/api/users/update/{}", alice.id),
            Some(&bob.token),
            Some(json!({ "bio": "hijacked" })),
        )
        .await;
    assert_eq!(not_mine.status, StatusCode::UNAUTHORIZED);

    let taken = app
        .call(
            Method::PUT,
            &format!("/api/users/update/{}", bob.id),
            Some(&bob.token),
            Some(json!({ "username": "alice" })),
        )
        .await;
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);

    let updated = app
        .call(
            Method::PUT,
            &format!("/api/users/update/{}", bob.id),
            Some(&bob.token),
            Some(json!({ "username": "robert", "bio": "hi there" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["username"], "robert");
    assert_eq!(updated.body["bio"], "hi there");

    let post = app.call(Method::GET, &format!("/api/posts/{}", post_id), None, None).await;
    assert_eq!(post.body["replies"][0]["username"], "robert");
    assert_eq!(post.body["replies"][0]["text"], "agreed");
}

#[tokio::test]
async fn replacing_avatar_removes_the_old_file_after_saving() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let pixel = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";
    let stored = |url: &str| app._media.path().join(url.rsplit('/').next().unwrap());

    let first = app
        .call(
            Method::PUT,
            &format!("/api/users/update/{}", alice.id),
            Some(&alice.token),
            Some(json!({ "profilePic": pixel })),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let first_pic = first.body["profilePic"].as_str().unwrap().to_string();
    assert!(stored(&first_pic).exists());

    let second = app
        .call(
            Method::PUT,
            &format!("/api/users/update/{}", alice.id),
            Some(&alice.token),
            Some(json!({ "profilePic": pixel })),
        )
        .await;
    assert_eq!(second.status, StatusCode::OK);
    let second_pic = second.body["profilePic"].as_str().unwrap().to_string();
    assert_ne!(first_pic, second_pic);
    assert!(!stored(&first_pic).exists());
    assert!(stored(&second_pic).exists());

    let profile = app.call(Method::GET, "/api/users/profile/alice", None, None).await;
    assert_eq!(profile.body["profilePic"], second_pic);
}

#[tokio::test]
async fn sent_message_is_relayed_and_persisted() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let (_, mut bob_rx) = app.state.dispatcher.connect(bob.id).await;
    while bob_rx.try_recv().is_ok() {}

    let sent = app
        .call(
            Method::POST,
            "/api/messages",
            Some(&alice.token),
            Some(json!({ "recipientId": bob.id, "message": "hey bob" })),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    let stored: Message = serde_json::from_value(sent.body).unwrap();
    assert_eq!(stored.sender, alice.id);
    assert!(!stored.seen);

    match bob_rx.try_recv().unwrap() {
        GatewayEvent::NewMessage(relayed) => assert_eq!(relayed, stored),
        other => panic!("expected NewMessage, got {:?}", other),
    }

    let history = app
        .call(
            Method::GET,
            &format!("/api/messages/{}", alice.id),
            Some(&bob.token),
            None,
        )
        .await;
    let history: Vec<Message> = serde_json::from_value(history.body).unwrap();
    assert_eq!(history, vec![stored]);
}

#[tokio::test]
async fn conversations_list_the_other_participant() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;
    let carol = app.signup("carol").await;

    let none = app
        .call(
            Method::GET,
            &format!("/api/messages/{}", bob.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(none.status, StatusCode::NOT_FOUND);
    assert_eq!(none.body["error"], "Conversation not found");

    for (from, to, text) in [(&alice, &bob, "hi bob"), (&carol, &alice, "hi alice")] {
        let reply = app
            .call(
                Method::POST,
                "/api/messages",
                Some(&from.token),
                Some(json!({ "recipientId": to.id, "message": text })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let list = app
        .call(Method::GET, "/api/messages/conversations", Some(&alice.token), None)
        .await;
    let list = list.body.as_array().unwrap().clone();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["participant"]["username"], "carol");
    assert_eq!(list[0]["lastMessage"]["text"], "hi alice");
    assert_eq!(list[0]["lastMessage"]["sender"], carol.id.to_string());
    assert_eq!(list[1]["participant"]["userId"], bob.id.to_string());

    let to_self = app
        .call(
            Method::POST,
            "/api/messages",
            Some(&alice.token),
            Some(json!({ "recipientId": alice.id, "message": "me" })),
        )
        .await;
    assert_eq!(to_self.status, StatusCode::BAD_REQUEST);

    let to_nobody = app
        .call(
            Method::POST,
            "/api/messages",
            Some(&alice.token),
            Some(json!({ "recipientId": Uuid::new_v4(), "message": "hello?" })),
        )
        .await;
    assert_eq!(to_nobody.status, StatusCode::NOT_FOUND);
}
