pub mod app_config;
pub mod database;
pub mod notification_repo;
pub mod order_repo;
pub mod payment_repo;
pub mod user_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use notification_repo::PgNotificationRepository;
pub use order_repo::PgOrderRepository;
pub use payment_repo::PgPaymentRepository;
pub use user_repo::PgUserRepository;
