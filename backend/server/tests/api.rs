use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use payloads::{Claims, Role};
use serde_json::{Value, json};
use server::{
    app,
    auth::decode_token,
    config::{AdminSeed, Config},
    memory::MemoryStore,
    state::AppState,
};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";
const ADMIN_EMAIL: &str = "admin@petition.example";
const ADMIN_PASSWORD: &str = "admin-password";

async fn test_app() -> Router {
    let mut config = Config::new(SECRET);
    config.hash_memory_kib = 1024;
    config.admin = Some(AdminSeed {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    });

    let state = AppState::with_store(config, Arc::new(MemoryStore::new()));
    state.seed_admin().await.unwrap();

    app(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = match body {
        Some(body) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn registration(email: &str, bio_id: &str) -> Value {
    json!({
        "email": email,
        "fullName": "Test Petitioner",
        "dob": "1990-04-01",
        "password": "correct horse",
        "bioId": bio_id,
    })
}

async fn register(app: &Router, email: &str, bio_id: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/petitioner/register",
        None,
        Some(registration(email, bio_id)),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/petitioner/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

async fn petitioner_token(app: &Router, email: &str, bio_id: &str) -> String {
    let (status, _) = register(app, email, bio_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = login(app, email, "correct horse").await;
    assert_eq!(status, StatusCode::OK);

    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    body["token"].as_str().unwrap().to_string()
}

async fn create_petition(app: &Router, token: &str, title: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/petitioner/petitions",
        Some(token),
        Some(json!({ "title": title, "text": format!("{title} text") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    body["petition"].clone()
}

async fn list(app: &Router, token: &str, uri: &str) -> Vec<Value> {
    let (status, body) = send(app, Method::GET, uri, Some(token), None).await;
    assert_eq!(status, StatusCode::OK);

    body["petitions"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_register_success_hides_password() {
    let app = test_app().await;

    let (status, body) = register(&app, "a@example.com", "K1YL8VA2HG").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully.");
    let text = body.to_string();
    assert!(!text.contains("correct horse"));
    assert!(!text.contains("argon2"));
}

#[tokio::test]
async fn test_register_duplicates_rejected() {
    let app = test_app().await;
    register(&app, "a@example.com", "K1YL8VA2HG").await;

    let (status, body) = register(&app, "a@example.com", "V30EPKZQI2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email or BioID already in use.");

    let (status, _) = register(&app, "b@example.com", "K1YL8VA2HG").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Email matching ignores case
    let (status, _) = register(&app, "A@Example.com", "V30EPKZQI2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_validation() {
    let app = test_app().await;

    let (status, body) = register(&app, "a@example.com", "NOT-ON-LIST").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid BioID.");

    let (status, body) = send(
        &app,
        Method::POST,
        "/petitioner/register",
        None,
        Some(json!({ "email": "a@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fullName"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/petitioner/register",
        None,
        Some(json!("not an object")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_role_claims() {
    let app = test_app().await;

    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let claims: Claims = decode_token(&token, SECRET).unwrap();
    assert_eq!(claims.role, Role::Petitioner);

    let token = admin_token(&app).await;
    let claims = decode_token(&token, SECRET).unwrap();
    assert_eq!(claims.role, Role::Admin);
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app().await;
    register(&app, "a@example.com", "K1YL8VA2HG").await;

    let (status, body) = login(&app, "a@example.com", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials.");

    let (status, body) = login(&app, "nobody@example.com", "correct horse").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found.");
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/petitioner/petitions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access denied. No token provided.");

    let (status, body) = send(
        &app,
        Method::GET,
        "/petitioner/petitions",
        Some("not.a.token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token.");

    let (status, _) = send(
        &app,
        Method::POST,
        "/petitioner/petitions/anything/sign",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_need_admin_role() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let petition = create_petition(&app, &token, "Parks").await;

    let (status, _) = send(&app, Method::GET, "/admin/petitions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/admin/petitions", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/admin/petitions/{}/respond", petition["id"].as_str().unwrap());
    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(&token),
        Some(json!({ "response": "Self-approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Still open
    let petitions = list(&app, &token, "/petitioner/petitions").await;
    assert_eq!(petitions[0]["status"], "open");
}

#[tokio::test]
async fn test_create_uses_token_identity() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let claims = decode_token(&token, SECRET).unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/petitioner/petitions",
        Some(&token),
        Some(json!({ "title": "Parks", "text": "More parks", "petitioner": "someone-else" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let petition = &body["petition"];
    assert_eq!(petition["petitioner"]["id"], claims.user_id.as_str());
    assert_eq!(petition["petitioner"]["email"], "a@example.com");
    assert_eq!(petition["status"], "open");
    assert_eq!(petition["signatures"], json!([]));
    assert!(petition.get("response").is_none());
}

#[tokio::test]
async fn test_create_requires_fields() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/petitioner/petitions",
        Some(&token),
        Some(json!({ "title": "Parks" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: text");
}

#[tokio::test]
async fn test_sign_rules() {
    let app = test_app().await;
    let alice = petitioner_token(&app, "alice@example.com", "K1YL8VA2HG").await;
    let bob = petitioner_token(&app, "bob@example.com", "V30EPKZQI2").await;
    let petition = create_petition(&app, &alice, "Parks").await;
    let uri = format!("/petitioner/petitions/{}/sign", petition["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Petition signed successfully.");

    let (status, body) = send(&app, Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already signed this petition.");

    let (status, _) = send(&app, Method::POST, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/petitioner/petitions/does-not-exist/sign",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Petition not found.");

    let petitions = list(&app, &alice, "/petitioner/petitions").await;
    assert_eq!(petitions[0]["signatures"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_filter() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let admin = admin_token(&app).await;

    create_petition(&app, &token, "First").await;
    let second = create_petition(&app, &token, "Second").await;
    create_petition(&app, &token, "Third").await;

    let uri = format!("/admin/petitions/{}/respond", second["id"].as_str().unwrap());
    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(&admin),
        Some(json!({ "response": "Done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let all = list(&app, &token, "/petitioner/petitions").await;
    assert_eq!(all.len(), 3);

    let open = list(&app, &token, "/petitioner/petitions?status=open").await;
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|p| p["status"] == "open"));

    let closed = list(&app, &token, "/petitioner/petitions?status=closed").await;
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0]["title"], "Second");

    let (status, _) = send(
        &app,
        Method::GET,
        "/petitioner/petitions?status=pending",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_closed_iff_response() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let admin = admin_token(&app).await;

    for title in ["One", "Two", "Three", "Four"] {
        create_petition(&app, &token, title).await;
    }

    let petitions = list(&app, &admin, "/admin/petitions").await;
    for petition in petitions.iter().step_by(2) {
        let uri = format!("/admin/petitions/{}/respond", petition["id"].as_str().unwrap());
        send(
            &app,
            Method::POST,
            &uri,
            Some(&admin),
            Some(json!({ "response": "Reviewed" })),
        )
        .await;
    }

    let petitions = list(&app, &admin, "/admin/petitions").await;
    assert_eq!(petitions.len(), 4);
    for petition in petitions {
        let closed = petition["status"] == "closed";
        let responded = petition.get("response").is_some_and(|r| !r.is_null());
        assert_eq!(closed, responded, "{petition}");
    }
}

#[tokio::test]
async fn test_respond_rules() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let admin = admin_token(&app).await;
    let petition = create_petition(&app, &token, "Parks").await;
    let uri = format!("/admin/petitions/{}/respond", petition["id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(&admin),
        Some(json!({ "response": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/petitions/does-not-exist/respond",
        Some(&admin),
        Some(json!({ "response": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Petition not found.");

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(&admin),
        Some(json!({ "response": "Acknowledged" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Response added and petition closed.");

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(&admin),
        Some(json!({ "response": "Changed my mind" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Petition is already closed.");

    let petitions = list(&app, &admin, "/admin/petitions").await;
    assert_eq!(petitions[0]["response"], "Acknowledged");
}

#[tokio::test]
async fn test_concurrent_signing_single_success() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let petition = create_petition(&app, &token, "Parks").await;
    let uri = format!("/petitioner/petitions/{}/sign", petition["id"].as_str().unwrap());

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let app = app.clone();
            let uri = uri.clone();
            let token = token.clone();
            tokio::spawn(async move { send(&app, Method::POST, &uri, Some(&token), None).await.0 })
        })
        .collect();

    let mut successes = 0;
    for attempt in attempts {
        if attempt.await.unwrap() == StatusCode::OK {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let petitions = list(&app, &token, "/petitioner/petitions").await;
    assert_eq!(petitions[0]["signatures"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_end_to_end() {
    let app = test_app().await;

    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;
    let user_id = decode_token(&token, SECRET).unwrap().user_id;

    let petition = create_petition(&app, &token, "Bike lanes").await;
    assert_eq!(petition["status"], "open");
    assert_eq!(petition["signatures"], json!([]));
    let id = petition["id"].as_str().unwrap().to_string();
    let sign_uri = format!("/petitioner/petitions/{id}/sign");

    let (status, _) = send(&app, Method::POST, &sign_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let petitions = list(&app, &token, "/petitioner/petitions").await;
    assert_eq!(petitions.len(), 1);
    assert_eq!(petitions[0]["signatures"], json!([user_id]));
    assert_eq!(petitions[0]["petitioner"]["fullName"], "Test Petitioner");

    let admin = admin_token(&app).await;
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/admin/petitions/{id}/respond"),
        Some(&admin),
        Some(json!({ "response": "Acknowledged" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let petitions = list(&app, &token, "/petitioner/petitions").await;
    assert_eq!(petitions[0]["status"], "closed");
    assert_eq!(petitions[0]["response"], "Acknowledged");

    let (status, body) = send(&app, Method::POST, &sign_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Petition is closed.");
}

#[tokio::test]
async fn test_health_and_fallback() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found.");
}

#[tokio::test]
async fn test_rejections_use_error_body() {
    let app = test_app().await;
    let token = petitioner_token(&app, "a@example.com", "K1YL8VA2HG").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/petitioner/petitions?status=open&status=closed",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed query"));

    let (status, body) = send(&app, Method::GET, "/petitioner/login", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed.");
}

#[tokio::test]
async fn test_admin_seed_idempotent() {
    let mut config = Config::new(SECRET);
    config.hash_memory_kib = 1024;
    config.admin = Some(AdminSeed {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    });

    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_store(config, store);

    state.seed_admin().await.unwrap();
    state.seed_admin().await.unwrap();

    let admin = state
        .store
        .find_user_by_email(ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, Role::Admin);
}
