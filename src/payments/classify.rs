//! Payment outcome classification.
//!
//! The provider's webhook payload and status-query response shapes are not
//! contractually fixed, so both classifiers probe candidate field names in
//! priority order. Each candidate list lives here as a single named table so
//! a new variant is a one-line change.
//!
//! Two deliberately different rules coexist:
//! - the webhook classifier is TOLERANT (the provider's own push corroborates
//!   the signal, and a missed confirmation would strand a paid registrant);
//! - the poll classifier is STRICT (it is user-triggered and directly gates
//!   "tell the user they're confirmed", so it additionally demands a
//!   transaction-proof field).

use serde_json::Value;

/// Signature header candidates, in priority order.
pub const SIGNATURE_HEADERS: &[&str] = &[
    "x-bazik-signature",
    "bazik-signature",
    "x-signature",
    "signature",
    "x-webhook-signature",
];

/// Transaction identifier field candidates, in priority order.
pub const TRANSACTION_ID_FIELDS: &[&str] = &["transaction_id", "reference", "order_id", "id"];

/// Status text field candidates.
const STATUS_FIELDS: &[&str] = &["status", "payment_status", "state"];

/// Boolean completion flag candidates.
const COMPLETED_FLAGS: &[&str] = &["paid", "success", "completed"];

/// Status texts the tolerant webhook rule accepts as completed.
const TOLERANT_COMPLETED: &[&str] = &["paid", "success", "completed", "successful"];

/// Status texts classified as a failed/cancelled payment.
const FAILED_STATUSES: &[&str] = &["failed", "cancelled", "canceled"];

/// Typed event names that mean a completed payment.
const COMPLETED_EVENT_TYPES: &[&str] = &["payment.completed", "payment.success"];

/// Status texts the strict poll rule accepts as completed.
const STRICT_COMPLETED: &[&str] = &["successful", "paid", "completed"];

/// Transaction-proof field candidates (code, bank reference, etc.).
const PROOF_FIELDS: &[&str] = &[
    "transactionCode",
    "transaction_code",
    "reference",
    "bankReference",
    "paymentReference",
    "moncash_transaction_id",
];

/// Amount confirmation field candidates (corroborating signal only).
const AMOUNT_FIELDS: &[&str] = &["amount", "amountPaid", "paidAmount"];

/// Classified payment outcome, shared by both transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
    Pending,
}

fn field_as_string(value: &Value, field: &str) -> Option<String> {
    match value.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn field_as_amount(value: &Value, field: &str) -> Option<i64> {
    match value.get(field) {
        Some(Value::Number(n)) => n.as_f64().map(|f| f.round() as i64),
        Some(Value::String(s)) => s.parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn flag_is_true(value: &Value, field: &str) -> bool {
    matches!(value.get(field), Some(Value::Bool(true)))
}

/// The payment object inside a status response, or the body itself when the
/// provider answers flat.
pub fn payment_object(body: &Value) -> &Value {
    match body.get("payment") {
        Some(p) if p.is_object() => p,
        _ => body,
    }
}

/// Extract a transaction identifier from a webhook event, trying candidate
/// field names in priority order. Returns None when no candidate is present.
pub fn extract_transaction_id(event: &Value) -> Option<String> {
    TRANSACTION_ID_FIELDS
        .iter()
        .find_map(|f| field_as_string(event, f))
}

/// Status text from the event, checking the top level first and then a
/// nested `payment` object.
pub fn status_text(event: &Value) -> Option<String> {
    STATUS_FIELDS
        .iter()
        .find_map(|f| field_as_string(event, f))
        .or_else(|| {
            event.get("payment").and_then(|p| {
                STATUS_FIELDS.iter().find_map(|f| field_as_string(p, f))
            })
        })
        .map(|s| s.to_lowercase())
}

/// Reported amount from a webhook event (top level or nested payment).
pub fn webhook_amount(event: &Value) -> Option<i64> {
    field_as_amount(event, "amount")
        .or_else(|| event.get("payment").and_then(|p| field_as_amount(p, "amount")))
}

/// Tolerant classification used by the webhook receiver.
pub fn classify_webhook(event: &Value) -> Outcome {
    let status = status_text(event);

    let status_completed = status
        .as_deref()
        .is_some_and(|s| TOLERANT_COMPLETED.contains(&s));

    let flag_completed = COMPLETED_FLAGS.iter().any(|f| {
        flag_is_true(event, f)
            || event.get("payment").is_some_and(|p| flag_is_true(p, f))
    });

    let event_completed = event
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| COMPLETED_EVENT_TYPES.contains(&t));

    if status_completed || flag_completed || event_completed {
        return Outcome::Completed;
    }

    if status.as_deref().is_some_and(|s| FAILED_STATUSES.contains(&s)) {
        return Outcome::Failed;
    }

    Outcome::Pending
}

/// Strict classification result for the verification poller.
#[derive(Debug, Clone)]
pub struct PollClassification {
    pub outcome: Outcome,
    pub has_proof: bool,
    /// Corroborating amount field, when present. Never sufficient alone.
    pub amount: Option<i64>,
}

/// Strict classification used by the verification poller: the status text
/// must explicitly equal a completed status AND a transaction-proof field
/// must be present. A boolean completion flag is also accepted in place of
/// the status text, but never in place of the proof.
pub fn classify_poll(body: &Value) -> PollClassification {
    let payment = payment_object(body);

    let has_proof = PROOF_FIELDS
        .iter()
        .any(|f| field_as_string(payment, f).is_some());

    let amount = AMOUNT_FIELDS
        .iter()
        .find_map(|f| field_as_amount(payment, f));

    // message is checked alongside status/state; some responses carry the
    // status word there only.
    let status_completed = STATUS_FIELDS
        .iter()
        .chain(std::iter::once(&"message"))
        .filter_map(|f| field_as_string(payment, f).or_else(|| field_as_string(body, f)))
        .any(|s| STRICT_COMPLETED.contains(&s.to_lowercase().as_str()));

    let flag_completed = COMPLETED_FLAGS.iter().any(|f| flag_is_true(payment, f));

    let outcome = if (status_completed || flag_completed) && has_proof {
        Outcome::Completed
    } else {
        Outcome::Pending
    };

    PollClassification {
        outcome,
        has_proof,
        amount,
    }
}
