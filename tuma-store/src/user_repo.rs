use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tuma_core::identity::{User, UserRole};
use tuma_core::repository::{Page, PageRequest, RepoError, UserRepository};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: Option<String>,
    role: String,
    vehicle_type: Option<String>,
    plate_number: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepoError> {
        Ok(User {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            role: self.role.parse::<UserRole>().map_err(RepoError::from)?,
            vehicle_type: self.vehicle_type,
            plate_number: self.plate_number,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, full_name, email, phone, role, vehicle_type, plate_number, is_active, created_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO users (id, full_name, email, phone, role, vehicle_type, plate_number, is_active, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(&user.vehicle_type)
        .bind(&user.plate_number)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn get_active_courier(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND role = 'courier' AND is_active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn list(&self, role: Option<UserRole>, page: PageRequest) -> Result<Page<User>, RepoError> {
        let role = role.map(|r| r.as_str());
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)")
                .bind(role)
                .fetch_one(&self.pool)
                .await?;
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE ($1::text IS NULL OR role = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(role)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let items = rows.into_iter().map(UserRow::into_user).collect::<Result<Vec<_>, _>>()?;
        Ok(Page { items, total, page: page.page, per_page: page.per_page })
    }

    async fn toggle_active(&self, id: Uuid) -> Result<Option<bool>, RepoError> {
        let now_active: Option<bool> = sqlx::query_scalar(
            "UPDATE users SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(now_active)
    }

    async fn set_role(
        &self,
        id: Uuid,
        role: UserRole,
        vehicle_type: Option<String>,
        plate_number: Option<String>,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE users SET role = $2,
                 vehicle_type = COALESCE($3, vehicle_type),
                 plate_number = COALESCE($4, plate_number)
             WHERE id = $1",
        )
        .bind(id)
        .bind(role.as_str())
        .bind(vehicle_type)
        .bind(plate_number)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_role(&self, role: Option<UserRole>) -> Result<i64, RepoError> {
        let role = role.map(|r| r.as_str());
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)")
                .bind(role)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
