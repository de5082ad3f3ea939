pub mod error;
pub mod lifecycle;
#[cfg(test)]
mod lifecycle_tests;
pub mod memory;
pub mod models;
pub mod pricing;
pub mod repository;

pub use error::OrderError;
pub use lifecycle::OrderLifecycle;
pub use models::{DeliveryCode, Order, OrderStatus};
pub use pricing::WeightCategory;
