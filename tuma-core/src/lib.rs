pub mod geo;
pub mod identity;
pub mod mail;
pub mod memory;
pub mod notify;
pub mod payment;
pub mod repository;

pub use identity::{AuthUser, User, UserRole};
