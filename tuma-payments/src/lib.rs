pub mod engine;
#[cfg(test)]
mod engine_tests;
pub mod error;
pub mod memory;
pub mod models;
pub mod receipt;
pub mod repository;

pub use engine::PaymentEngine;
pub use error::PaymentError;
pub use models::{derived_status, Payment, PaymentStatus};
