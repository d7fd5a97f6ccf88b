//! Transaction id generation.
//!
//! Payment attempts are correlated with registrations through locally-minted
//! transaction ids that the provider echoes back in webhooks and status
//! queries. Initial payments and remaining-balance payments use visually
//! distinct prefixes so the two can never collide or be mistaken for each
//! other.
//!
//! Format: `SEMPAY-{unix_millis}-{10 hex chars}` for initial payments,
//! `SEMPAY-REM-{unix_millis}-{10 hex chars}` for remaining-balance payments.

use chrono::Utc;
use uuid::Uuid;

const INITIAL_PREFIX: &str = "SEMPAY";
const REMAINING_PREFIX: &str = "SEMPAY-REM";

fn random_suffix() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..10].to_string()
}

/// Mint a transaction id for an initial payment attempt.
pub fn initial_transaction_id() -> String {
    format!(
        "{}-{}-{}",
        INITIAL_PREFIX,
        Utc::now().timestamp_millis(),
        random_suffix()
    )
}

/// Mint a transaction id for a remaining-balance payment attempt.
pub fn remaining_transaction_id() -> String {
    format!(
        "{}-{}-{}",
        REMAINING_PREFIX,
        Utc::now().timestamp_millis(),
        random_suffix()
    )
}

/// Whether an id belongs to the remaining-balance namespace.
pub fn is_remaining_id(id: &str) -> bool {
    id.starts_with("SEMPAY-REM-")
}
