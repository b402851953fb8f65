//! Drives both functions through the local HTTP gateway without binding a port.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use time::macros::datetime;
use tower::ServiceExt;

use course_functions::app::build_app;
use course_functions::db::memory::StoredCourse;
use course_functions::db::MemoryStore;
use course_functions::state::AppState;

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_course(StoredCourse {
        id: 1,
        title: "Основы программирования".into(),
        description: Some("С нуля".into()),
        duration: Some("8 недель".into()),
        level: Some("Начальный".into()),
        image_url: None,
        instructor_id: None,
        created_at: datetime!(2024-04-01 12:00),
    });
    store
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let res = app.clone().oneshot(req).await.expect("router responds");
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = res.into_body().collect().await.expect("body").to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn register_login_enroll_and_list() {
    let store = seeded_store();
    let app = build_app(AppState::fake(store.clone()));

    let (status, headers, body) = send(
        &app,
        post_json(
            "/auth",
            json!({"action": "register", "email": "A@B.com", "password": "secret1", "full_name": "Ann"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");
    let registered: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(registered["user"]["email"], "a@b.com");
    assert_eq!(registered["user"]["role"], "student");
    let user_id = registered["user"]["id"].as_i64().unwrap();

    let (status, _, body) = send(
        &app,
        post_json("/auth", json!({"action": "login", "email": "a@b.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("password_hash"));

    let (status, _, body) = send(
        &app,
        post_json("/courses", json!({"action": "enroll", "user_id": user_id, "course_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let enrolled: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(enrolled, json!({"success": true, "message": "Вы записаны на курс"}));

    let req = Request::builder()
        .uri(format!("/courses?user_id={user_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let listing: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listing["courses"][0]["progress"], 0);
    assert_eq!(listing["courses"][0]["duration"], "8 недель");

    assert_eq!(store.sessions_opened(), 4);
    assert_eq!(store.sessions_closed(), 4);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = build_app(AppState::fake(seeded_store()));
    send(
        &app,
        post_json(
            "/auth",
            json!({"action": "register", "email": "a@b.com", "password": "secret1", "full_name": "Ann"}),
        ),
    )
    .await;

    let (status, _, body) = send(
        &app,
        post_json("/auth", json!({"action": "login", "email": "a@b.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err, json!({"error": "Неверный email или пароль"}));
}

#[tokio::test]
async fn preflight_on_both_functions() {
    let app = build_app(AppState::fake(MemoryStore::new()));
    for (uri, allow) in [
        ("/auth", "Content-Type, X-User-Id, X-Auth-Token"),
        ("/courses", "Content-Type, X-User-Id"),
    ] {
        let req = Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], allow);
        assert_eq!(headers["access-control-max-age"], "86400");
    }
}

#[tokio::test]
async fn listing_without_user_has_no_progress_key() {
    let app = build_app(AppState::fake(seeded_store()));
    let req = Request::builder().uri("/courses").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let listing: Value = serde_json::from_str(&body).unwrap();
    assert!(listing["courses"][0].get("progress").is_none());
}

#[tokio::test]
async fn unsupported_method_is_405() {
    let app = build_app(AppState::fake(MemoryStore::new()));
    let req = Request::builder()
        .method("PUT")
        .uri("/courses")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body.contains("error"));
}

#[tokio::test]
async fn health_check() {
    let app = build_app(AppState::fake(MemoryStore::new()));
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}
