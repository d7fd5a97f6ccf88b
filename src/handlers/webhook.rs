//! Bazik webhook receiver.
//!
//! The body is taken raw so the signature is verified over the exact bytes
//! the provider signed, before any parsing. Unknown transaction ids and
//! stale events answer 200 so the provider stops redelivering; only a bad
//! signature (401), an unparseable payload (400) or a store failure (500)
//! ask for another attempt.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::db::{self, AppState, ApplyOutcome};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::handlers::common;
use crate::payments::classify::{self, SIGNATURE_HEADERS};
use crate::reconcile::{self, Decision};

pub async fn bazik_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    if state.bazik.has_webhook_secret() {
        let signature = SIGNATURE_HEADERS
            .iter()
            .find_map(|name| headers.get(*name))
            .and_then(|v| v.to_str().ok());

        match signature {
            Some(sig) if state.bazik.verify_webhook_signature(&body, sig) => {}
            Some(_) => {
                tracing::warn!("Webhook signature mismatch");
                return Err(AppError::Unauthorized);
            }
            None => {
                tracing::warn!("Webhook arrived without a signature header");
                return Err(AppError::Unauthorized);
            }
        }
    } else {
        tracing::warn!("Webhook accepted unverified, no webhook secret configured");
    }

    let event: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid webhook payload: {}", e)))?;

    let Some(transaction_id) = classify::extract_transaction_id(&event) else {
        return Err(AppError::BadRequest(
            "webhook payload carries no transaction id".to_string(),
        ));
    };

    let outcome = classify::classify_webhook(&event);
    let amount = classify::webhook_amount(&event);

    tracing::info!(
        transaction_id,
        outcome = ?outcome,
        "Webhook received"
    );

    let matched = {
        let conn = state.db.get()?;
        db::get_registration_by_transaction(&conn, &transaction_id)?
    };

    let Some((registration, kind)) = matched else {
        // 200 on purpose: a retry will never make this id known.
        tracing::warn!(transaction_id, "Webhook for unknown transaction id");
        return Ok(Json(json!({
            "success": true,
            "message": "No matching registration",
            "transaction_id": transaction_id,
        })));
    };

    let decision = reconcile::reconcile(&registration, outcome, amount, kind);

    let applied = apply_decision(&state, &registration.id, &transaction_id, &decision)?;

    if applied == ApplyOutcome::Applied {
        common::perform_side_effects(&state, &registration, &decision).await?;
    } else {
        tracing::info!(
            transaction_id,
            outcome = ?applied,
            "Webhook event not applied"
        );
    }

    let status = {
        let conn = state.db.get()?;
        db::get_registration(&conn, &registration.id)?
            .map(|r| r.status)
            .unwrap_or(registration.status)
    };

    Ok(Json(json!({
        "success": true,
        "message": decision_message(&decision, applied),
        "transaction_id": transaction_id,
        "status": status.as_str(),
    })))
}

fn apply_decision(
    state: &AppState,
    registration_id: &str,
    transaction_id: &str,
    decision: &Decision,
) -> Result<ApplyOutcome> {
    let mut conn = state.db.get()?;
    match decision {
        Decision::Confirm { amount_total } => {
            db::apply_confirmation(&mut conn, registration_id, transaction_id, *amount_total)
        }
        Decision::PartialPending { amount_total, .. } => {
            db::apply_partial_pending(&mut conn, registration_id, transaction_id, *amount_total)
        }
        Decision::ConfirmRemaining {
            credited,
            amount_total,
        } => db::apply_remaining_completion(
            &mut conn,
            registration_id,
            transaction_id,
            *credited,
            *amount_total,
        ),
        Decision::Cancel => db::apply_cancellation(&conn, registration_id),
        Decision::NoOp => Ok(ApplyOutcome::Superseded),
    }
}

fn decision_message(decision: &Decision, applied: ApplyOutcome) -> &'static str {
    if applied == ApplyOutcome::AlreadyProcessed {
        return "Event already processed";
    }
    match decision {
        Decision::Confirm { .. } => "Registration confirmed",
        Decision::PartialPending { .. } => "Partial payment recorded",
        Decision::ConfirmRemaining { .. } => "Remaining balance settled",
        Decision::Cancel => "Registration cancelled",
        Decision::NoOp => "Payment still pending",
    }
}
