//! Webhook receiver flow tests: signature enforcement, reconciliation
//! outcomes and redelivery behavior, exercised through the router.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

// ------------------------------------------------------------------------
// Signature enforcement
// ------------------------------------------------------------------------

#[tokio::test]
async fn valid_signature_is_accepted() {
    let state = create_test_app_state(Some("whsec_testsecret"));
    seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-1-full");

    let body = json!({"transaction_id": "SEMPAY-1-full", "status": "paid"})
        .to_string()
        .into_bytes();
    let sig = sign_payload("whsec_testsecret", &body);

    let response = post_raw(
        app(state.clone()),
        "/webhook/bazik",
        body,
        &[("x-bazik-signature", sig.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_signature_returns_401() {
    let state = create_test_app_state(Some("testsecret"));
    let body = json!({"transaction_id": "SEMPAY-1-x", "status": "paid"})
        .to_string()
        .into_bytes();

    let response = post_raw(app(state), "/webhook/bazik", body, &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_body_returns_401() {
    let state = create_test_app_state(Some("testsecret"));

    let signed = json!({"transaction_id": "SEMPAY-1-x", "status": "paid"})
        .to_string()
        .into_bytes();
    let sig = sign_payload("testsecret", &signed);

    let tampered = json!({"transaction_id": "SEMPAY-1-x", "status": "paid", "amount": 1})
        .to_string()
        .into_bytes();

    let response = post_raw(
        app(state),
        "/webhook/bazik",
        tampered,
        &[("x-bazik-signature", sig.as_str())],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn alternate_signature_headers_are_accepted() {
    for header in ["bazik-signature", "x-signature", "x-webhook-signature"] {
        let state = create_test_app_state(Some("testsecret"));
        seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-1-full");

        let body = json!({"transaction_id": "SEMPAY-1-full", "status": "paid"})
            .to_string()
            .into_bytes();
        let sig = sign_payload("testsecret", &body);

        let response =
            post_raw(app(state), "/webhook/bazik", body, &[(header, sig.as_str())]).await;
        assert_eq!(response.status(), StatusCode::OK, "header {header}");
    }
}

#[tokio::test]
async fn no_configured_secret_accepts_unsigned_webhooks() {
    let state = create_test_app_state(None);
    seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-1-full");

    let body = json!({"transaction_id": "SEMPAY-1-full", "status": "paid"})
        .to_string()
        .into_bytes();
    let response = post_raw(app(state.clone()), "/webhook/bazik", body, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ------------------------------------------------------------------------
// Reconciliation through the webhook
// ------------------------------------------------------------------------

#[tokio::test]
async fn full_payment_confirms_registration() {
    let state = create_test_app_state(None);
    let reg = seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-2-full");

    let response = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-2-full", "status": "successful", "amount": 5000}),
    )
    .await;
    let (status, body) = response_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "confirmed");

    let after = get_registration(&state, &reg.id);
    assert_eq!(after.status, RegistrationStatus::Confirmed);
    assert_eq!(after.amount_total, Some(5000));
}

#[tokio::test]
async fn redelivered_webhook_is_idempotent() {
    let state = create_test_app_state(None);
    let reg = seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-3-full");

    let event = json!({"transaction_id": "SEMPAY-3-full", "status": "paid"});
    let first = post_json(app(state.clone()), "/webhook/bazik", event.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post_json(app(state.clone()), "/webhook/bazik", event).await;
    let (status, body) = response_json(second).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event already processed");

    let after = get_registration(&state, &reg.id);
    assert_eq!(after.status, RegistrationStatus::Confirmed);
}

#[tokio::test]
async fn partial_payment_stays_pending_and_mints_remaining_link() {
    let state = create_test_app_state(None);
    let reg = seed_registration(&state, PaymentPercentage::Half, 2500, "SEMPAY-4-half");

    let response = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-4-half", "status": "completed", "amount": 2500}),
    )
    .await;
    let (status, body) = response_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Partial payment recorded");
    assert_eq!(body["status"], "pending");

    let after = get_registration(&state, &reg.id);
    assert_eq!(after.status, RegistrationStatus::Pending);
    assert_eq!(after.amount_total, Some(5000));
    assert_eq!(after.amount_paid, 2500);

    // The remaining-balance id is stored even though the provider is
    // unreachable in tests, so its webhook can always be matched.
    let remaining = after.remaining_transaction_id.expect("remaining id minted");
    assert!(remaining.starts_with("SEMPAY-REM-"));
}

#[tokio::test]
async fn remaining_balance_webhook_settles_the_plan() {
    let state = create_test_app_state(None);
    let reg = seed_registration(&state, PaymentPercentage::Half, 2500, "SEMPAY-5-half");

    let first = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-5-half", "status": "paid", "amount": 2500}),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let remaining_id = get_registration(&state, &reg.id)
        .remaining_transaction_id
        .expect("remaining id minted");

    let second = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": remaining_id, "status": "paid", "amount": 2500}),
    )
    .await;
    let (status, body) = response_json(second).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Remaining balance settled");

    let after = get_registration(&state, &reg.id);
    assert_eq!(after.status, RegistrationStatus::Confirmed);
    assert_eq!(after.amount_paid, 5000);
    assert_eq!(after.payment_percentage, PaymentPercentage::Full);

    // Redelivery of the remaining-balance webhook must not credit twice.
    let third = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": after.remaining_transaction_id.unwrap(), "status": "paid", "amount": 2500}),
    )
    .await;
    assert_eq!(third.status(), StatusCode::OK);
    assert_eq!(get_registration(&state, &reg.id).amount_paid, 5000);
}

#[tokio::test]
async fn failed_payment_cancels_pending_registration() {
    let state = create_test_app_state(None);
    let reg = seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-6-full");

    let response = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-6-full", "status": "failed"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_registration(&state, &reg.id).status,
        RegistrationStatus::Cancelled
    );
}

#[tokio::test]
async fn cancellation_never_overwrites_confirmed() {
    let state = create_test_app_state(None);
    let reg = seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-7-full");

    post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-7-full", "status": "paid"}),
    )
    .await;

    let response = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-7-full", "status": "cancelled"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_registration(&state, &reg.id).status,
        RegistrationStatus::Confirmed
    );
}

// ------------------------------------------------------------------------
// Payload edge cases
// ------------------------------------------------------------------------

#[tokio::test]
async fn missing_transaction_id_returns_400() {
    let state = create_test_app_state(None);
    let response = post_json(app(state), "/webhook/bazik", json!({"status": "paid"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_transaction_id_returns_200() {
    // 200 on purpose so the provider does not redeliver forever.
    let state = create_test_app_state(None);
    let response = post_json(
        app(state),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-404-none", "status": "paid"}),
    )
    .await;
    let (status, body) = response_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No matching registration");
}

#[tokio::test]
async fn pending_status_webhook_changes_nothing() {
    let state = create_test_app_state(None);
    let reg = seed_registration(&state, PaymentPercentage::Full, 5000, "SEMPAY-8-full");

    let response = post_json(
        app(state.clone()),
        "/webhook/bazik",
        json!({"transaction_id": "SEMPAY-8-full", "status": "processing"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_registration(&state, &reg.id).status,
        RegistrationStatus::Pending
    );
}

#[tokio::test]
async fn get_on_webhook_endpoint_returns_405() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let state = create_test_app_state(None);
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/webhook/bazik")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
