//! Test utilities and fixtures for sempay integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::Value;
use tower::ServiceExt;

pub use sempay::db::{self, init_db, AppState};
pub use sempay::email::EmailService;
pub use sempay::models::*;
pub use sempay::payments::BazikClient;

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an AppState for testing. The pool holds a single in-memory
/// connection so every handler sees the same database. The provider base
/// URL points at an unroutable port so intent creation fails fast, and no
/// email key is configured so sends are disabled.
pub fn create_test_app_state(webhook_secret: Option<&str>) -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let bazik = BazikClient::new(
        "http://127.0.0.1:9".to_string(),
        "test-user".to_string(),
        "test-secret".to_string(),
        webhook_secret.map(str::to_string),
    );

    let email = EmailService::new(None, "test@sempay.local".to_string(), String::new());

    AppState {
        db: pool,
        bazik,
        email,
        base_url: "http://localhost:3000".to_string(),
    }
}

pub fn app(state: AppState) -> Router {
    sempay::handlers::router(state)
}

/// Insert a pending registration and return it.
pub fn seed_registration(
    state: &AppState,
    pct: PaymentPercentage,
    amount_paid: i64,
    transaction_id: &str,
) -> Registration {
    let conn = state.db.get().unwrap();
    db::create_registration(
        &conn,
        &CreateRegistration {
            full_name: "Marie Joseph".to_string(),
            email: "marie@example.com".to_string(),
            phone: "+50937000000".to_string(),
            experience_level: ExperienceLevel::Beginner,
            motivation: Some("pare pou aprann".to_string()),
            amount_paid,
            payment_percentage: pct,
            promo_code: None,
            status: RegistrationStatus::Pending,
            transaction_id: Some(transaction_id.to_string()),
        },
    )
    .unwrap()
}

pub fn get_registration(state: &AppState, id: &str) -> Registration {
    let conn = state.db.get().unwrap();
    db::get_registration(&conn, id).unwrap().unwrap()
}

/// POST a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// POST raw bytes with arbitrary headers, as a webhook delivery would.
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: Vec<u8>,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn response_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// HMAC-SHA256 hex signature the way the provider signs webhook bodies.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    let secret = secret.strip_prefix("whsec_").unwrap_or(secret);
    let mut mac =
        Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
