//! Reconciliation policy shared by the webhook receiver and the
//! verification poller.
//!
//! Both transports end up with the same inputs: a matched registration, a
//! classified payment outcome, an optionally-reported amount, and which
//! transaction column matched. The decision of what to do with the record
//! lives here, in one pure function, so the two paths cannot drift apart.

use crate::models::Registration;
use crate::payments::Outcome;

/// Which transaction column the incoming id matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Initial,
    RemainingBalance,
}

/// What the store layer should do with the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Full payment completed: confirm and send the access email.
    Confirm { amount_total: i64 },
    /// Partial payment completed: stay pending, record the full price, mint
    /// a remaining-balance payment link and email it.
    PartialPending {
        amount_total: i64,
        amount_remaining: i64,
    },
    /// Remaining-balance payment completed: credit it, mark the plan full,
    /// confirm and send the access email.
    ConfirmRemaining { credited: i64, amount_total: i64 },
    /// Payment failed or was cancelled by the payer.
    Cancel,
    /// Nothing actionable (payment still pending).
    NoOp,
}

/// Decide what a completed/failed/pending payment means for a registration.
///
/// `reported_amount` is the provider's amount field when present; for a
/// remaining-balance payment it is credited as-is, falling back to the
/// locally-computed outstanding balance when the provider omits it.
pub fn reconcile(
    registration: &Registration,
    outcome: Outcome,
    reported_amount: Option<i64>,
    matched: MatchKind,
) -> Decision {
    match outcome {
        Outcome::Pending => Decision::NoOp,
        Outcome::Failed => Decision::Cancel,
        Outcome::Completed => match matched {
            MatchKind::RemainingBalance => {
                let amount_total = registration.total_owed();
                let credited = reported_amount.unwrap_or_else(|| registration.remaining_due());
                Decision::ConfirmRemaining {
                    credited,
                    amount_total,
                }
            }
            MatchKind::Initial => {
                let amount_total = registration.total_owed();
                if registration.payment_percentage.is_full() {
                    Decision::Confirm { amount_total }
                } else {
                    Decision::PartialPending {
                        amount_total,
                        amount_remaining: registration.remaining_due(),
                    }
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ExperienceLevel, PaymentPercentage, RegistrationStatus,
    };

    fn registration(pct: PaymentPercentage, paid: i64, total: Option<i64>) -> Registration {
        Registration {
            id: "r1".to_string(),
            full_name: "Marie Joseph".to_string(),
            email: "marie@example.com".to_string(),
            phone: "+50937000000".to_string(),
            experience_level: ExperienceLevel::Intermediate,
            motivation: None,
            amount_paid: paid,
            amount_total: total,
            payment_percentage: pct,
            promo_code: None,
            status: RegistrationStatus::Pending,
            transaction_id: Some("SEMPAY-1-aaaaaaaaaa".to_string()),
            remaining_transaction_id: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_full_payment_confirms() {
        let reg = registration(PaymentPercentage::Full, 5000, None);
        let decision = reconcile(&reg, Outcome::Completed, Some(5000), MatchKind::Initial);
        assert_eq!(decision, Decision::Confirm { amount_total: 5000 });
    }

    #[test]
    fn test_partial_payment_stays_pending_with_remaining() {
        let reg = registration(PaymentPercentage::Half, 2500, None);
        let decision = reconcile(&reg, Outcome::Completed, Some(2500), MatchKind::Initial);
        assert_eq!(
            decision,
            Decision::PartialPending {
                amount_total: 5000,
                amount_remaining: 2500,
            }
        );

        let reg = registration(PaymentPercentage::Quarter, 1250, None);
        let decision = reconcile(&reg, Outcome::Completed, None, MatchKind::Initial);
        assert_eq!(
            decision,
            Decision::PartialPending {
                amount_total: 5000,
                amount_remaining: 3750,
            }
        );
    }

    #[test]
    fn test_remaining_match_credits_reported_amount() {
        let reg = registration(PaymentPercentage::Half, 2500, Some(5000));
        let decision = reconcile(
            &reg,
            Outcome::Completed,
            Some(2500),
            MatchKind::RemainingBalance,
        );
        assert_eq!(
            decision,
            Decision::ConfirmRemaining {
                credited: 2500,
                amount_total: 5000,
            }
        );
    }

    #[test]
    fn test_remaining_match_falls_back_to_outstanding_balance() {
        let reg = registration(PaymentPercentage::Quarter, 1250, Some(5000));
        let decision = reconcile(&reg, Outcome::Completed, None, MatchKind::RemainingBalance);
        assert_eq!(
            decision,
            Decision::ConfirmRemaining {
                credited: 3750,
                amount_total: 5000,
            }
        );
    }

    #[test]
    fn test_failed_cancels_regardless_of_plan() {
        for pct in [
            PaymentPercentage::Quarter,
            PaymentPercentage::Half,
            PaymentPercentage::Full,
        ] {
            let reg = registration(pct, 1000, None);
            assert_eq!(
                reconcile(&reg, Outcome::Failed, None, MatchKind::Initial),
                Decision::Cancel
            );
        }
    }

    #[test]
    fn test_pending_is_a_noop() {
        let reg = registration(PaymentPercentage::Full, 5000, None);
        assert_eq!(
            reconcile(&reg, Outcome::Pending, Some(5000), MatchKind::Initial),
            Decision::NoOp
        );
    }
}
