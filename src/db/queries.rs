//! Registration store queries and the transactional reconciliation writes.
//!
//! All state transitions go through the `apply_*` functions. Each one runs
//! in a single SQLite transaction that couples a dedup marker insert with a
//! conditional status update, so a redelivered event can never double-apply
//! and a settled registration can never be overwritten.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CreateRegistration, ExperienceLevel, PaymentPercentage, Registration, RegistrationStatus,
};
use crate::reconcile::MatchKind;

/// Outcome of a transactional state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The transition was applied now. Side effects (emails, remaining-link
    /// creation) belong to this delivery.
    Applied,
    /// A marker for this transaction id already exists. Redelivery; no-op.
    AlreadyProcessed,
    /// The registration already left the pending state. Stale event; no-op.
    Superseded,
}

fn row_to_registration(row: &Row) -> rusqlite::Result<Registration> {
    let level: String = row.get("experience_level")?;
    let pct: String = row.get("payment_percentage")?;
    let status: String = row.get("status")?;

    Ok(Registration {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        experience_level: ExperienceLevel::parse(&level).unwrap_or(ExperienceLevel::Beginner),
        motivation: row.get("motivation")?,
        amount_paid: row.get("amount_paid")?,
        amount_total: row.get("amount_total")?,
        payment_percentage: PaymentPercentage::parse(&pct).unwrap_or(PaymentPercentage::Full),
        promo_code: row.get("promo_code")?,
        status: RegistrationStatus::parse(&status).unwrap_or(RegistrationStatus::Pending),
        transaction_id: row.get("transaction_id")?,
        remaining_transaction_id: row.get("remaining_transaction_id")?,
        created_at: row.get("created_at")?,
    })
}

const SELECT_REGISTRATION: &str = "SELECT id, full_name, email, phone, experience_level, \
     motivation, amount_paid, amount_total, payment_percentage, promo_code, status, \
     transaction_id, remaining_transaction_id, created_at FROM registrations";

pub fn create_registration(conn: &Connection, new: &CreateRegistration) -> Result<Registration> {
    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO registrations
         (id, full_name, email, phone, experience_level, motivation, amount_paid,
          payment_percentage, promo_code, status, transaction_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            id,
            new.full_name,
            new.email,
            new.phone,
            new.experience_level.as_str(),
            new.motivation,
            new.amount_paid,
            new.payment_percentage.as_str(),
            new.promo_code,
            new.status.as_str(),
            new.transaction_id,
            created_at,
        ],
    )?;

    get_registration(conn, &id)?
        .ok_or_else(|| crate::error::AppError::Internal("registration vanished after insert".to_string()))
}

pub fn get_registration(conn: &Connection, id: &str) -> Result<Option<Registration>> {
    let reg = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_REGISTRATION),
            params![id],
            row_to_registration,
        )
        .optional()?;
    Ok(reg)
}

/// Look up a registration by a transaction id, matching against both the
/// initial and the remaining-balance columns and reporting which one hit.
pub fn get_registration_by_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Option<(Registration, MatchKind)>> {
    let reg = conn
        .query_row(
            &format!(
                "{} WHERE transaction_id = ?1 OR remaining_transaction_id = ?1",
                SELECT_REGISTRATION
            ),
            params![transaction_id],
            row_to_registration,
        )
        .optional()?;

    Ok(reg.map(|r| {
        let kind = if r.remaining_transaction_id.as_deref() == Some(transaction_id) {
            MatchKind::RemainingBalance
        } else {
            MatchKind::Initial
        };
        (r, kind)
    }))
}

/// Most recent confirmed registration for an email address, if any.
pub fn get_latest_confirmed_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<Registration>> {
    let reg = conn
        .query_row(
            &format!(
                "{} WHERE email = ?1 AND status = 'confirmed' ORDER BY created_at DESC LIMIT 1",
                SELECT_REGISTRATION
            ),
            params![email],
            row_to_registration,
        )
        .optional()?;
    Ok(reg)
}

/// Record the minted remaining-balance transaction id before the intent is
/// created with the provider, so a webhook for it always finds the row.
pub fn set_remaining_transaction_id(
    conn: &Connection,
    registration_id: &str,
    remaining_transaction_id: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE registrations SET remaining_transaction_id = ?1 WHERE id = ?2",
        params![remaining_transaction_id, registration_id],
    )?;
    Ok(())
}

/// Insert a dedup marker for a transaction id. Returns false when the
/// marker already exists.
fn try_record_payment_event(conn: &Connection, transaction_id: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO payment_events (id, transaction_id, created_at)
         VALUES (?1, ?2, ?3)",
        params![
            Uuid::new_v4().to_string(),
            transaction_id,
            Utc::now().timestamp(),
        ],
    )?;
    Ok(inserted == 1)
}

/// Confirm a registration after a completed full payment.
pub fn apply_confirmation(
    conn: &mut Connection,
    registration_id: &str,
    transaction_id: &str,
    amount_total: i64,
) -> Result<ApplyOutcome> {
    let tx = conn.transaction()?;

    if !try_record_payment_event(&tx, transaction_id)? {
        return Ok(ApplyOutcome::AlreadyProcessed);
    }

    let updated = tx.execute(
        "UPDATE registrations SET status = 'confirmed', amount_total = ?1
         WHERE id = ?2 AND status = 'pending'",
        params![amount_total, registration_id],
    )?;

    if updated == 0 {
        // Already settled; dropping the transaction discards the marker too.
        return Ok(ApplyOutcome::Superseded);
    }

    tx.commit()?;
    Ok(ApplyOutcome::Applied)
}

/// Record a completed partial payment: the registration stays pending but
/// the full price becomes known and the event is marked processed.
pub fn apply_partial_pending(
    conn: &mut Connection,
    registration_id: &str,
    transaction_id: &str,
    amount_total: i64,
) -> Result<ApplyOutcome> {
    let tx = conn.transaction()?;

    if !try_record_payment_event(&tx, transaction_id)? {
        return Ok(ApplyOutcome::AlreadyProcessed);
    }

    let updated = tx.execute(
        "UPDATE registrations SET amount_total = ?1
         WHERE id = ?2 AND status = 'pending'",
        params![amount_total, registration_id],
    )?;

    if updated == 0 {
        return Ok(ApplyOutcome::Superseded);
    }

    tx.commit()?;
    Ok(ApplyOutcome::Applied)
}

/// Settle a remaining-balance payment: credit the amount, mark the plan
/// complete and confirm.
pub fn apply_remaining_completion(
    conn: &mut Connection,
    registration_id: &str,
    transaction_id: &str,
    credited: i64,
    amount_total: i64,
) -> Result<ApplyOutcome> {
    let tx = conn.transaction()?;

    if !try_record_payment_event(&tx, transaction_id)? {
        return Ok(ApplyOutcome::AlreadyProcessed);
    }

    let updated = tx.execute(
        "UPDATE registrations
         SET status = 'confirmed',
             payment_percentage = '100',
             amount_paid = amount_paid + ?1,
             amount_total = ?2
         WHERE id = ?3 AND status = 'pending'",
        params![credited, amount_total, registration_id],
    )?;

    if updated == 0 {
        return Ok(ApplyOutcome::Superseded);
    }

    tx.commit()?;
    Ok(ApplyOutcome::Applied)
}

/// Cancel a pending registration after a failed or cancelled payment.
/// Confirmed registrations are never touched. No marker is written: a
/// later completed delivery for the same id must still be able to apply
/// if the cancellation lost the race, and repeating a cancellation is
/// harmless.
pub fn apply_cancellation(conn: &Connection, registration_id: &str) -> Result<ApplyOutcome> {
    let updated = conn.execute(
        "UPDATE registrations SET status = 'cancelled'
         WHERE id = ?1 AND status = 'pending'",
        params![registration_id],
    )?;

    Ok(if updated == 1 {
        ApplyOutcome::Applied
    } else {
        ApplyOutcome::Superseded
    })
}
