use async_trait::async_trait;
use uuid::Uuid;

use crate::identity::{User, UserRole};

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

/// Offset pagination shared by the list endpoints.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page: page.max(1), per_page: per_page.clamp(1, 100) }
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), RepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    /// Only resolves users that are active couriers.
    async fn get_active_courier(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn list(&self, role: Option<UserRole>, page: PageRequest) -> Result<Page<User>, RepoError>;

    /// Flips the soft-deactivation flag; returns the new value, or
    /// `None` when the user does not exist.
    async fn toggle_active(&self, id: Uuid) -> Result<Option<bool>, RepoError>;

    /// Changes the role, filling vehicle defaults when promoting to
    /// courier. Returns false when the user does not exist.
    async fn set_role(
        &self,
        id: Uuid,
        role: UserRole,
        vehicle_type: Option<String>,
        plate_number: Option<String>,
    ) -> Result<bool, RepoError>;

    async fn count_by_role(&self, role: Option<UserRole>) -> Result<i64, RepoError>;
}
