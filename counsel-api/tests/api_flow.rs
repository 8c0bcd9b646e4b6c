//! End-to-end flow tests driving the full router stack.
//!
//! Covers the assignment workflow from counsellor registration through
//! student binding, including capacity enforcement and the idempotent
//! rebind, all through the HTTP surface.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use counsel_api::{create_api_router, ApiConfig, AppState, AuthConfig};
use counsel_storage::{MemoryStorage, Storage};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN_API_KEY: &str = "integration-admin-key";

fn build_app() -> Router {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    let mut auth_config = AuthConfig::default();
    auth_config.api_keys.insert(ADMIN_API_KEY.to_string());

    // Flows here fire requests far faster than the default burst allows.
    let mut api_config = ApiConfig::default();
    api_config.rate_limit_enabled = false;

    // Keep the receiver alive so draft submissions are accepted.
    let (autosave_tx, autosave_rx) = mpsc::channel(16);
    std::mem::forget(autosave_rx);

    let state = AppState {
        storage,
        auth_config,
        api_config,
        autosave_tx,
        start_time: std::time::Instant::now(),
    };
    create_api_router(state).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn admin_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-api-key", ADMIN_API_KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer_post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn uuid_field(body: &Value, field: &str) -> Uuid {
    Uuid::from_str(body[field].as_str().unwrap()).unwrap()
}

async fn create_student(app: &Router, roll_no: &str) -> Uuid {
    let (status, body) = send(
        app,
        admin_post(
            "/api/v1/students",
            json!({
                "roll_no": roll_no,
                "name": format!("Student {}", roll_no),
                "email": format!("{}@college.edu", roll_no.to_lowercase()),
                "year": 2,
                "semester": 1,
                "branch": "CSE",
                "section": "A",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    uuid_field(&body, "student_id")
}

/// Register a student login linked to the given record and return a JWT.
async fn student_token(app: &Router, roll_no: &str, student_id: Uuid) -> String {
    let (status, _) = send(
        app,
        admin_post(
            "/api/v1/auth/register",
            json!({
                "username": roll_no,
                "password": "hunter2hunter2",
                "role": "student",
                "subject_id": student_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"username": roll_no, "password": "hunter2hunter2"}).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["role"], "student");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_reject_anonymous_requests() {
    let app = build_app();
    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/api/v1/students")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn full_bind_flow_with_capacity_enforcement() {
    let app = build_app();

    // Admin registers a counsellor with one two-seat slot.
    let (status, body) = send(
        &app,
        admin_post(
            "/api/v1/counsellors",
            json!({
                "name": "Dr. Meena Iyer",
                "email": "meena.iyer@college.edu",
                "phone": null,
                "department": "CSE",
                "assignments": [
                    {"year": 2, "semester": 1, "branch": "CSE", "section": "A", "max_students": 2}
                ],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let counsellor_id = uuid_field(&body, "counsellor_id");
    assert_eq!(body["slots"][0]["current_students"], 0);

    let s1 = create_student(&app, "19CS001").await;
    let s2 = create_student(&app, "19CS002").await;
    let s3 = create_student(&app, "19CS003").await;
    let token = student_token(&app, "19CS001", s1).await;

    // The student sees the open slot, least loaded first.
    let (status, body) = send(
        &app,
        bearer_get(
            "/api/v1/assignments/available?year=2&semester=1&branch=CSE&section=A",
            &token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["counsellor_name"], "Dr. Meena Iyer");
    assert_eq!(body[0]["is_full"], false);

    let bind_body = |student_id: Uuid| {
        json!({
            "student_id": student_id,
            "counsellor_id": counsellor_id,
            "year": 2,
            "semester": 1,
            "branch": "CSE",
            "section": "A",
        })
    };

    // Student binds their own record.
    let (status, body) = send(
        &app,
        bearer_post("/api/v1/assignments/bind", &token, bind_body(s1)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uuid_field(&body, "counsellor_id"), counsellor_id);

    // Rebinding to the slot already held is a no-op, not a second seat.
    let (status, _) = send(
        &app,
        bearer_post("/api/v1/assignments/bind", &token, bind_body(s1)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // A student cannot bind someone else's record.
    let (status, body) = send(
        &app,
        bearer_post("/api/v1/assignments/bind", &token, bind_body(s2)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // Admin fills the second seat.
    let (status, _) = send(&app, admin_post("/api/v1/assignments/bind", bind_body(s2))).await;
    assert_eq!(status, StatusCode::OK);

    // Third bind hits the capacity ceiling.
    let (status, body) = send(&app, admin_post("/api/v1/assignments/bind", bind_body(s3))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");

    // Slot listing reflects both seats taken.
    let (status, body) = send(
        &app,
        bearer_get(
            &format!("/api/v1/counsellors/{}/slots", counsellor_id),
            &token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["current_students"], 2);
    assert_eq!(body[0]["is_full"], true);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = build_app();
    let s1 = create_student(&app, "19CS010").await;
    let _ = student_token(&app, "19CS010", s1).await;

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"username": "19CS010", "password": "wrong"}).to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}
