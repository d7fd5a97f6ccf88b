use serde::{Deserialize, Serialize};

/// Authoritative gate for granting course access.
///
/// Transitions are one-way: pending may move to confirmed or cancelled (or be
/// re-affirmed pending); nothing ever overwrites confirmed, nothing leaves
/// cancelled. Enforced by conditional updates at the write boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Installment plan chosen at registration time. Immutable once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentPercentage {
    #[serde(rename = "25")]
    Quarter,
    #[serde(rename = "50")]
    Half,
    #[serde(rename = "100")]
    Full,
}

impl PaymentPercentage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarter => "25",
            Self::Half => "50",
            Self::Full => "100",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "25" => Some(Self::Quarter),
            "50" => Some(Self::Half),
            "100" => Some(Self::Full),
            _ => None,
        }
    }

    /// Factor to back-compute the full price from the installment share.
    pub fn multiplier(&self) -> i64 {
        match self {
            Self::Quarter => 4,
            Self::Half => 2,
            Self::Full => 1,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

/// One person's intent to attend, with payment plan and confirmation status.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience_level: ExperienceLevel,
    pub motivation: Option<String>,
    /// Cumulative amount credited so far, in HTG. Monotonically non-decreasing.
    pub amount_paid: i64,
    /// Full price owed. When absent, back-computed from amount_paid and the plan.
    pub amount_total: Option<i64>,
    pub payment_percentage: PaymentPercentage,
    pub promo_code: Option<String>,
    pub status: RegistrationStatus,
    /// Id of the initial payment attempt. Never reused.
    pub transaction_id: Option<String>,
    /// Id of the remaining-balance payment attempt, set only after a partial
    /// plan's first payment succeeds. Distinct namespace from transaction_id.
    pub remaining_transaction_id: Option<String>,
    pub created_at: i64,
}

impl Registration {
    /// Full price owed: the stored total when present, otherwise
    /// back-computed by scaling the installment share.
    pub fn total_owed(&self) -> i64 {
        match self.amount_total {
            Some(total) if total > 0 => total,
            _ => self.amount_paid * self.payment_percentage.multiplier(),
        }
    }

    /// Outstanding balance for the chosen plan.
    pub fn remaining_due(&self) -> i64 {
        (self.total_owed() - self.amount_paid).max(0)
    }
}

#[derive(Debug, Clone)]
pub struct CreateRegistration {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience_level: ExperienceLevel,
    pub motivation: Option<String>,
    pub amount_paid: i64,
    pub payment_percentage: PaymentPercentage,
    pub promo_code: Option<String>,
    pub status: RegistrationStatus,
    pub transaction_id: Option<String>,
}
