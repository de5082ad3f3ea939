use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use tuma_core::geo::Coordinates;
use tuma_core::repository::{Page, PageRequest, RepoError};
use tuma_order::models::{DeliveryCode, Order, OrderStatus};
use tuma_order::pricing::WeightCategory;
use tuma_order::repository::{
    CourierLeader, CourierStats, DailyRevenue, OrderFilter, OrderRepository, TransitionStamps,
};

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    courier_id: Option<Uuid>,
    parcel_name: String,
    description: Option<String>,
    weight_kg: f64,
    pickup_address: String,
    pickup_lat: Option<f64>,
    pickup_lng: Option<f64>,
    destination_address: String,
    destination_lat: Option<f64>,
    destination_lng: Option<f64>,
    distance_km: Option<f64>,
    price: f64,
    status: String,
    delivery_code: String,
    parcel_image_url: Option<String>,
    current_lat: Option<f64>,
    current_lng: Option<f64>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    picked_up_at: Option<chrono::DateTime<chrono::Utc>>,
    delivered_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn coords(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    }
}

impl OrderRow {
    fn into_order(self) -> Result<Order, RepoError> {
        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            courier_id: self.courier_id,
            parcel_name: self.parcel_name,
            description: self.description,
            weight_kg: self.weight_kg,
            weight_category: WeightCategory::from_weight(self.weight_kg),
            pickup_address: self.pickup_address,
            pickup_coords: coords(self.pickup_lat, self.pickup_lng),
            destination_address: self.destination_address,
            destination_coords: coords(self.destination_lat, self.destination_lng),
            distance_km: self.distance_km,
            price: self.price,
            status: self.status.parse::<OrderStatus>().map_err(RepoError::from)?,
            delivery_code: DeliveryCode::from_stored(self.delivery_code),
            parcel_image_url: self.parcel_image_url,
            current_location: coords(self.current_lat, self.current_lng),
            created_at: self.created_at,
            updated_at: self.updated_at,
            picked_up_at: self.picked_up_at,
            delivered_at: self.delivered_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, customer_id, courier_id, parcel_name, description, weight_kg, \
     pickup_address, pickup_lat, pickup_lng, destination_address, destination_lat, destination_lng, \
     distance_km, price, status, delivery_code, parcel_image_url, current_lat, current_lng, \
     created_at, updated_at, picked_up_at, delivered_at";

const ORDER_FILTER: &str = "($1::uuid IS NULL OR customer_id = $1)
       AND ($2::uuid IS NULL OR courier_id = $2)
       AND ($3::text IS NULL OR status = $3)";

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO parcel_orders (id, customer_id, courier_id, parcel_name, description, weight_kg,
                 pickup_address, pickup_lat, pickup_lng, destination_address, destination_lat, destination_lng,
                 distance_km, price, status, delivery_code, parcel_image_url, current_lat, current_lng,
                 created_at, updated_at, picked_up_at, delivered_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                 $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.courier_id)
        .bind(&order.parcel_name)
        .bind(&order.description)
        .bind(order.weight_kg)
        .bind(&order.pickup_address)
        .bind(order.pickup_coords.map(|c| c.lat))
        .bind(order.pickup_coords.map(|c| c.lng))
        .bind(&order.destination_address)
        .bind(order.destination_coords.map(|c| c.lat))
        .bind(order.destination_coords.map(|c| c.lng))
        .bind(order.distance_km)
        .bind(order.price)
        .bind(order.status.as_str())
        .bind(order.delivery_code.as_str())
        .bind(&order.parcel_image_url)
        .bind(order.current_location.map(|c| c.lat))
        .bind(order.current_location.map(|c| c.lng))
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.picked_up_at)
        .bind(order.delivered_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM parcel_orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, RepoError> {
        let status = filter.status.map(|s| s.as_str());
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM parcel_orders WHERE {ORDER_FILTER}"
        ))
        .bind(filter.customer_id)
        .bind(filter.courier_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM parcel_orders
             WHERE {ORDER_FILTER}
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.customer_id)
        .bind(filter.courier_id)
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let items = rows.into_iter().map(OrderRow::into_order).collect::<Result<Vec<_>, _>>()?;
        Ok(Page { items, total, page: page.page, per_page: page.per_page })
    }

    // Compare-and-swap: the status guard makes the loser of a
    // concurrent transition touch zero rows.
    async fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        stamps: TransitionStamps,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE parcel_orders SET status = $3,
                 picked_up_at = COALESCE($4, picked_up_at),
                 delivered_at = COALESCE($5, delivered_at),
                 updated_at = NOW()
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(stamps.picked_up_at)
        .bind(stamps.delivered_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn force_status(
        &self,
        id: Uuid,
        to: OrderStatus,
        stamps: TransitionStamps,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE parcel_orders SET status = $2,
                 picked_up_at = COALESCE($3, picked_up_at),
                 delivered_at = COALESCE($4, delivered_at),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(to.as_str())
        .bind(stamps.picked_up_at)
        .bind(stamps.delivered_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn assign_courier(&self, id: Uuid, courier_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE parcel_orders SET courier_id = $2, status = 'assigned', updated_at = NOW()
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(courier_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_destination(
        &self,
        id: Uuid,
        address: &str,
        coords: Option<Coordinates>,
        distance_km: Option<f64>,
        price: f64,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE parcel_orders SET destination_address = $2,
                 destination_lat = $3, destination_lng = $4,
                 distance_km = $5, price = $6, updated_at = NOW()
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(address)
        .bind(coords.map(|c| c.lat))
        .bind(coords.map(|c| c.lng))
        .bind(distance_km)
        .bind(price)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_location(&self, id: Uuid, coords: Coordinates) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE parcel_orders SET current_lat = $2, current_lng = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(coords.lat)
        .bind(coords.lng)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn courier_stats(&self, courier_id: Uuid) -> Result<CourierStats, RepoError> {
        #[derive(sqlx::FromRow)]
        struct StatsRow {
            total_orders: i64,
            delivered_orders: i64,
            in_transit_orders: i64,
            earnings: f64,
        }

        let row: StatsRow = sqlx::query_as(
            "SELECT COUNT(*) AS total_orders,
                 COUNT(*) FILTER (WHERE status = 'delivered') AS delivered_orders,
                 COUNT(*) FILTER (WHERE status = 'in_transit') AS in_transit_orders,
                 COALESCE(SUM(price) FILTER (WHERE status = 'delivered'), 0)::double precision AS earnings
             FROM parcel_orders WHERE courier_id = $1",
        )
        .bind(courier_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(CourierStats {
            total_orders: row.total_orders,
            delivered_orders: row.delivered_orders,
            in_transit_orders: row.in_transit_orders,
            earnings: row.earnings,
        })
    }

    async fn status_counts(&self) -> Result<HashMap<OrderStatus, i64>, RepoError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM parcel_orders GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        let mut counts = HashMap::new();
        for (status, count) in rows {
            counts.insert(status.parse::<OrderStatus>().map_err(RepoError::from)?, count);
        }
        Ok(counts)
    }

    async fn revenue_total(&self) -> Result<f64, RepoError> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(price), 0)::double precision FROM parcel_orders
             WHERE status IN ('delivered', 'in_transit')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn revenue_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DailyRevenue>, RepoError> {
        let rows: Vec<(chrono::NaiveDate, f64)> = sqlx::query_as(
            "SELECT created_at::date AS day, SUM(price)::double precision
             FROM parcel_orders
             WHERE status = 'delivered' AND created_at >= $1
             GROUP BY day ORDER BY day ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(date, revenue)| DailyRevenue { date, revenue }).collect())
    }

    async fn top_couriers(&self, limit: i64) -> Result<Vec<CourierLeader>, RepoError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT courier_id, COUNT(*) AS deliveries
             FROM parcel_orders
             WHERE status = 'delivered' AND courier_id IS NOT NULL
             GROUP BY courier_id ORDER BY deliveries DESC, courier_id ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(courier_id, deliveries)| CourierLeader { courier_id, deliveries })
            .collect())
    }
}
