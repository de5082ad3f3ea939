use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use tuma_core::geo::Coordinates;

use crate::pricing::WeightCategory;

/// Order status in the delivery lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Courier-driven adjacency table. Assignment (`pending` →
    /// `assigned`) is an admin operation and intentionally absent.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[],
            OrderStatus::Assigned => &[OrderStatus::PickedUp, OrderStatus::Cancelled],
            OrderStatus::PickedUp => &[OrderStatus::InTransit],
            OrderStatus::InTransit => &[OrderStatus::Delivered],
            OrderStatus::Delivered => &[],
            OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "assigned" => Ok(OrderStatus::Assigned),
            "picked_up" => Ok(OrderStatus::PickedUp),
            "in_transit" => Ok(OrderStatus::InTransit),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// One-time 6-digit confirmation code handed to the customer at
/// creation and demanded from the courier to mark delivery. Uniform
/// random and zero-padded; unique enough for single-order verification,
/// not globally. Deliberately not `Serialize`: it reaches the outside
/// world only through the creation email and the owner's detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryCode(String);

impl DeliveryCode {
    pub fn generate() -> Self {
        let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Self(format!("{n:06}"))
    }

    /// Restores a stored code without re-generating.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Exact string comparison after trimming both sides.
    pub fn matches(&self, supplied: &str) -> bool {
        self.0.trim() == supplied.trim()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The central entity: a customer's request to move a parcel from
/// pickup to destination.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub parcel_name: String,
    pub description: Option<String>,
    pub weight_kg: f64,
    pub weight_category: WeightCategory,
    pub pickup_address: String,
    pub pickup_coords: Option<Coordinates>,
    pub destination_address: String,
    pub destination_coords: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub price: f64,
    pub status: OrderStatus,
    pub delivery_code: DeliveryCode,
    pub parcel_image_url: Option<String>,
    pub current_location: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacency_table_matches_the_lifecycle() {
        use OrderStatus::*;
        assert!(Assigned.can_transition_to(PickedUp));
        assert!(Assigned.can_transition_to(Cancelled));
        assert!(PickedUp.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(PickedUp));
        assert!(!Assigned.can_transition_to(Delivered));
        assert!(!PickedUp.can_transition_to(Delivered));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for target in OrderStatus::ALL {
            assert!(!OrderStatus::Delivered.can_transition_to(target));
            assert!(!OrderStatus::Cancelled.can_transition_to(target));
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::InTransit.is_terminal());
    }

    #[test]
    fn delivery_code_is_six_digits() {
        for _ in 0..100 {
            let code = DeliveryCode::generate();
            assert_eq!(code.as_str().len(), 6);
            assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn delivery_code_match_trims_both_sides() {
        let code = DeliveryCode::from_stored("042137");
        assert!(code.matches(" 042137 "));
        assert!(!code.matches("042138"));
    }
}
