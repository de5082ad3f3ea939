use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use tuma_core::geo::Coordinates;
use tuma_core::repository::{Page, PageRequest, RepoError};

use crate::models::{Order, OrderStatus};

/// Role-scoped listing filter; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

/// Timestamps to stamp alongside a status write. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionStamps {
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl TransitionStamps {
    /// Stamps for entering `target` at `now`.
    pub fn entering(target: OrderStatus, now: DateTime<Utc>) -> Self {
        Self {
            picked_up_at: (target == OrderStatus::PickedUp).then_some(now),
            delivered_at: (target == OrderStatus::Delivered).then_some(now),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CourierStats {
    pub total_orders: i64,
    pub delivered_orders: i64,
    pub in_transit_orders: i64,
    pub earnings: f64,
}

/// One day of delivered-order revenue, keyed by the day the orders
/// were placed.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRevenue {
    pub date: chrono::NaiveDate,
    pub revenue: f64,
}

/// A courier ranked by completed deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourierLeader {
    pub courier_id: Uuid,
    pub deliveries: i64,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), RepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError>;

    /// Newest first.
    async fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, RepoError>;

    /// Compare-and-swap status write: applies only while the stored
    /// status still equals `from`. Returns false when another request
    /// won the race, leaving the row untouched.
    async fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        stamps: TransitionStamps,
    ) -> Result<bool, RepoError>;

    /// Admin escape hatch: unconditional status write. Returns false
    /// only when the order does not exist.
    async fn force_status(
        &self,
        id: Uuid,
        to: OrderStatus,
        stamps: TransitionStamps,
    ) -> Result<bool, RepoError>;

    /// Sets the courier and flips `pending` → `assigned` in one guarded
    /// write. False when the order is no longer pending.
    async fn assign_courier(&self, id: Uuid, courier_id: Uuid) -> Result<bool, RepoError>;

    /// Rewrites the destination, distance and price while the order is
    /// still pending. False when the pending guard fails.
    async fn update_destination(
        &self,
        id: Uuid,
        address: &str,
        coords: Option<Coordinates>,
        distance_km: Option<f64>,
        price: f64,
    ) -> Result<bool, RepoError>;

    /// Courier-reported live position. False when the order is missing.
    async fn update_location(&self, id: Uuid, coords: Coordinates) -> Result<bool, RepoError>;

    async fn courier_stats(&self, courier_id: Uuid) -> Result<CourierStats, RepoError>;

    async fn status_counts(&self) -> Result<HashMap<OrderStatus, i64>, RepoError>;

    /// Sum of prices over in-transit and delivered orders.
    async fn revenue_total(&self) -> Result<f64, RepoError>;

    /// Delivered-order revenue grouped by the day the order was
    /// placed, oldest first, for orders placed at or after `since`.
    /// Days with no deliveries are absent.
    async fn revenue_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DailyRevenue>, RepoError>;

    /// Couriers ranked by delivered orders, busiest first.
    async fn top_couriers(&self, limit: i64) -> Result<Vec<CourierLeader>, RepoError>;
}
