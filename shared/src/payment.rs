use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a payment is in its review.
///
/// `Pending` moves to `Approved` or `Rejected`; both are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

/// What the owner decides about a pending payment. These are the only
/// moves a payment can make, and both leave it final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    pub const fn outcome(self) -> PaymentStatus {
        match self {
            Verdict::Approve => PaymentStatus::Approved,
            Verdict::Reject => PaymentStatus::Rejected,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
