//! Synchronous payment verification.
//!
//! Called by the frontend when the payer returns from the hosted payment
//! page before the webhook has landed. Queries the provider directly and
//! applies the same reconciliation policy as the webhook path. The strict
//! classifier gates this path: a status answer without transaction proof is
//! reported as pending, never confirmed.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{self, AppState, ApplyOutcome};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::handlers::common;
use crate::payments::{classify, Outcome, PollResult};
use crate::reconcile::{self, Decision, MatchKind};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    /// COMPLETED or PENDING. Failures surface as errors, not statuses.
    pub payment_status: &'static str,
    pub transaction_id: String,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pourcentage_paye: Option<String>,
    pub full_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<Value>,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let transaction_id = req.transaction_id.trim().to_string();
    if transaction_id.is_empty() {
        return Err(AppError::BadRequest("transaction_id is required".to_string()));
    }

    let token = state.bazik.fetch_access_token().await?;

    let body = match state
        .bazik
        .fetch_payment_status(&token, &transaction_id)
        .await?
    {
        // 404 means the payment window was never opened. Pending, not an
        // error, and nothing to write.
        PollResult::NotFound => {
            return Ok(Json(pending_response(transaction_id, None)));
        }
        PollResult::Known(body) => body,
    };

    let cls = classify::classify_poll(&body);
    tracing::info!(
        transaction_id,
        outcome = ?cls.outcome,
        has_proof = cls.has_proof,
        "Payment status verified"
    );

    if cls.outcome != Outcome::Completed {
        // Built purely from the provider's answer; the store is not touched
        // on an unconfirmed poll.
        return Ok(Json(pending_response(transaction_id, Some(body))));
    }

    let matched = {
        let conn = state.db.get()?;
        db::get_registration_by_transaction(&conn, &transaction_id)?
    };

    let Some((registration, kind)) = matched else {
        tracing::warn!(transaction_id, "Completed payment for unknown transaction id");
        return Ok(Json(VerifyResponse {
            success: true,
            payment_status: "COMPLETED",
            transaction_id,
            message: "Paiement confirmé",
            pourcentage_paye: None,
            full_access: false,
            payment_details: Some(body),
        }));
    };

    let decision = reconcile::reconcile(&registration, Outcome::Completed, cls.amount, kind);

    let applied = {
        let mut conn = state.db.get()?;
        match &decision {
            Decision::Confirm { amount_total } => db::apply_confirmation(
                &mut conn,
                &registration.id,
                &transaction_id,
                *amount_total,
            )?,
            Decision::PartialPending { amount_total, .. } => db::apply_partial_pending(
                &mut conn,
                &registration.id,
                &transaction_id,
                *amount_total,
            )?,
            Decision::ConfirmRemaining {
                credited,
                amount_total,
            } => db::apply_remaining_completion(
                &mut conn,
                &registration.id,
                &transaction_id,
                *credited,
                *amount_total,
            )?,
            Decision::Cancel | Decision::NoOp => ApplyOutcome::Superseded,
        }
    };

    if applied == ApplyOutcome::Applied {
        common::perform_side_effects(&state, &registration, &decision).await?;
    }

    let full_access =
        registration.payment_percentage.is_full() || kind == MatchKind::RemainingBalance;
    // The payment itself completed either way; full_access says whether the
    // whole plan is settled.
    let message = if full_access {
        "Paiement confirmé"
    } else {
        "Paiement partiel confirmé"
    };

    Ok(Json(VerifyResponse {
        success: true,
        payment_status: "COMPLETED",
        transaction_id,
        message,
        pourcentage_paye: Some(registration.payment_percentage.as_str().to_string()),
        full_access,
        payment_details: Some(body),
    }))
}

fn pending_response(transaction_id: String, details: Option<Value>) -> VerifyResponse {
    VerifyResponse {
        success: true,
        payment_status: "PENDING",
        transaction_id,
        message: "Paiement en attente",
        pourcentage_paye: None,
        full_access: false,
        payment_details: details,
    }
}
