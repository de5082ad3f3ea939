//! In-memory order store mirroring the Postgres repository's
//! compare-and-swap semantics, for engine tests and local wiring.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use tuma_core::geo::Coordinates;
use tuma_core::repository::{Page, PageRequest, RepoError};

use crate::models::{Order, OrderStatus};
use crate::repository::{
    CourierLeader, CourierStats, DailyRevenue, OrderFilter, OrderRepository, TransitionStamps,
};

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<Uuid, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_stamps(order: &mut Order, stamps: TransitionStamps) {
        if let Some(t) = stamps.picked_up_at {
            order.picked_up_at = Some(t);
        }
        if let Some(t) = stamps.delivered_at {
            order.delivered_at = Some(t);
        }
        order.updated_at = Utc::now();
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepoError> {
        self.orders.lock().expect("order map poisoned").insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.orders.lock().expect("order map poisoned").get(&id).cloned())
    }

    async fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, RepoError> {
        let map = self.orders.lock().expect("order map poisoned");
        let mut matched: Vec<Order> = map
            .values()
            .filter(|o| filter.customer_id.map_or(true, |c| o.customer_id == c))
            .filter(|o| filter.courier_id.map_or(true, |c| o.courier_id == Some(c)))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(Page { items, total, page: page.page, per_page: page.per_page })
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        stamps: TransitionStamps,
    ) -> Result<bool, RepoError> {
        let mut map = self.orders.lock().expect("order map poisoned");
        match map.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                Self::apply_stamps(order, stamps);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn force_status(
        &self,
        id: Uuid,
        to: OrderStatus,
        stamps: TransitionStamps,
    ) -> Result<bool, RepoError> {
        let mut map = self.orders.lock().expect("order map poisoned");
        match map.get_mut(&id) {
            Some(order) => {
                order.status = to;
                Self::apply_stamps(order, stamps);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn assign_courier(&self, id: Uuid, courier_id: Uuid) -> Result<bool, RepoError> {
        let mut map = self.orders.lock().expect("order map poisoned");
        match map.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.courier_id = Some(courier_id);
                order.status = OrderStatus::Assigned;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_destination(
        &self,
        id: Uuid,
        address: &str,
        coords: Option<Coordinates>,
        distance_km: Option<f64>,
        price: f64,
    ) -> Result<bool, RepoError> {
        let mut map = self.orders.lock().expect("order map poisoned");
        match map.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.destination_address = address.to_string();
                order.destination_coords = coords;
                order.distance_km = distance_km;
                order.price = price;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_location(&self, id: Uuid, coords: Coordinates) -> Result<bool, RepoError> {
        let mut map = self.orders.lock().expect("order map poisoned");
        match map.get_mut(&id) {
            Some(order) => {
                order.current_location = Some(coords);
                order.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn courier_stats(&self, courier_id: Uuid) -> Result<CourierStats, RepoError> {
        let map = self.orders.lock().expect("order map poisoned");
        let mut stats = CourierStats::default();
        for order in map.values().filter(|o| o.courier_id == Some(courier_id)) {
            stats.total_orders += 1;
            match order.status {
                OrderStatus::Delivered => {
                    stats.delivered_orders += 1;
                    stats.earnings += order.price;
                }
                OrderStatus::InTransit => stats.in_transit_orders += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn status_counts(&self) -> Result<HashMap<OrderStatus, i64>, RepoError> {
        let map = self.orders.lock().expect("order map poisoned");
        let mut counts = HashMap::new();
        for order in map.values() {
            *counts.entry(order.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn revenue_total(&self) -> Result<f64, RepoError> {
        let map = self.orders.lock().expect("order map poisoned");
        Ok(map
            .values()
            .filter(|o| matches!(o.status, OrderStatus::Delivered | OrderStatus::InTransit))
            .map(|o| o.price)
            .sum())
    }

    async fn revenue_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DailyRevenue>, RepoError> {
        let map = self.orders.lock().expect("order map poisoned");
        let mut by_day: HashMap<chrono::NaiveDate, f64> = HashMap::new();
        for order in map
            .values()
            .filter(|o| o.status == OrderStatus::Delivered && o.created_at >= since)
        {
            *by_day.entry(order.created_at.date_naive()).or_insert(0.0) += order.price;
        }
        let mut days: Vec<DailyRevenue> =
            by_day.into_iter().map(|(date, revenue)| DailyRevenue { date, revenue }).collect();
        days.sort_by_key(|d| d.date);
        Ok(days)
    }

    async fn top_couriers(&self, limit: i64) -> Result<Vec<CourierLeader>, RepoError> {
        let map = self.orders.lock().expect("order map poisoned");
        let mut deliveries: HashMap<Uuid, i64> = HashMap::new();
        for order in map.values().filter(|o| o.status == OrderStatus::Delivered) {
            if let Some(courier_id) = order.courier_id {
                *deliveries.entry(courier_id).or_insert(0) += 1;
            }
        }
        let mut leaders: Vec<CourierLeader> = deliveries
            .into_iter()
            .map(|(courier_id, deliveries)| CourierLeader { courier_id, deliveries })
            .collect();
        leaders.sort_by(|a, b| b.deliveries.cmp(&a.deliveries).then(a.courier_id.cmp(&b.courier_id)));
        leaders.truncate(limit.max(0) as usize);
        Ok(leaders)
    }
}
