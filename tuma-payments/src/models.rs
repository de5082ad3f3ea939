use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use tuma_core::payment::CheckoutId;

/// One initiation attempt against the push-payment provider. An order
/// may accumulate several of these; see [`derived_status`] for how they
/// collapse into the order's payment standing.
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: f64,
    pub method: String,
    pub checkout_id: CheckoutId,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(order_id: Uuid, amount: f64, checkout_id: CheckoutId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount,
            method: "mpesa".to_string(),
            checkout_id,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Terminal statuses never change again, whatever later callbacks
    /// claim.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Collapses an order's payment attempts, oldest first, into a single
/// standing: any completed attempt wins outright, otherwise the most
/// recent attempt speaks, and no attempts at all reads as pending.
pub fn derived_status(attempts: &[PaymentStatus]) -> PaymentStatus {
    if attempts.contains(&PaymentStatus::Completed) {
        return PaymentStatus::Completed;
    }
    attempts.last().copied().unwrap_or(PaymentStatus::Pending)
}
