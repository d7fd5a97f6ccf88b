//! Side effects shared by the webhook receiver and the verification poller.
//!
//! A reconciliation decision is applied to the store by the caller; what
//! happens afterwards (access email, remaining-balance link) is identical on
//! both paths and lives here. Email failures are logged, never fatal: the
//! state transition has already committed and must not be rolled back or
//! retried because a notification bounced.

use crate::db::{self, AppState};
use crate::email::EmailMessage;
use crate::error::Result;
use crate::id;
use crate::models::Registration;
use crate::payments::PaymentIntent;
use crate::reconcile::Decision;

pub async fn perform_side_effects(
    state: &AppState,
    registration: &Registration,
    decision: &Decision,
) -> Result<()> {
    match decision {
        Decision::Confirm { .. } | Decision::ConfirmRemaining { .. } => {
            send_access_email(state, registration).await;
        }
        Decision::PartialPending {
            amount_remaining, ..
        } => {
            create_remaining_link(state, registration, *amount_remaining).await?;
        }
        Decision::Cancel | Decision::NoOp => {}
    }
    Ok(())
}

pub async fn send_access_email(state: &AppState, registration: &Registration) {
    let message = EmailMessage::FormationAccess {
        to: registration.email.clone(),
        full_name: registration.full_name.clone(),
    };
    if let Err(e) = state.email.send(&message).await {
        tracing::error!(
            registration_id = registration.id,
            "Access email failed: {}",
            e
        );
    }
}

/// Mint a remaining-balance transaction id, create the payment intent and
/// email the link. The id is stored before the intent is created so a
/// webhook for it always finds the registration, even if this process dies
/// mid-flight.
async fn create_remaining_link(
    state: &AppState,
    registration: &Registration,
    amount_remaining: i64,
) -> Result<()> {
    let remaining_txid = id::remaining_transaction_id();

    let conn = state.db.get()?;
    db::set_remaining_transaction_id(&conn, &registration.id, &remaining_txid)?;
    drop(conn);

    let callback_url = format!("{}/webhook/bazik", state.base_url);
    let return_url = format!("{}/#inscription", state.base_url);
    let intent = state
        .bazik
        .create_payment_intent(&PaymentIntent {
            amount: amount_remaining,
            transaction_id: &remaining_txid,
            full_name: &registration.full_name,
            email: &registration.email,
            phone: &registration.phone,
            description: "Balans enskripsyon seminè",
            callback_url: &callback_url,
            return_url: &return_url,
        })
        .await;

    // Without a hosted payment URL the reminder still goes out, pointing at
    // the registration page where a fresh link can be requested.
    let payment_link = intent
        .payment_url
        .unwrap_or_else(|| format!("{}/#inscription", state.base_url));

    if !intent.success {
        tracing::warn!(
            registration_id = registration.id,
            remaining_transaction_id = remaining_txid,
            "Remaining-balance intent creation failed, emailing fallback link"
        );
    }

    let message = EmailMessage::RemainingPayment {
        to: registration.email.clone(),
        full_name: registration.full_name.clone(),
        amount_remaining,
        percentage_paid: registration.payment_percentage.as_str().to_string(),
        payment_link,
    };
    if let Err(e) = state.email.send(&message).await {
        tracing::error!(
            registration_id = registration.id,
            "Remaining-balance email failed: {}",
            e
        );
    }

    Ok(())
}
