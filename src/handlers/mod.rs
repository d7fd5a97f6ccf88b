mod access;
mod common;
mod register;
mod verify;
mod webhook;

use axum::{
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::db::AppState;
use crate::extractors::Json;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register::register))
        .route("/webhook/bazik", post(webhook::bazik_webhook))
        .route("/verify-payment", post(verify::verify_payment))
        .route("/send-formation-access", post(access::send_formation_access))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
