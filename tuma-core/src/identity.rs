use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of roles. The transition engine matches on this
/// exhaustively, so new roles force a compile error at every guard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Courier,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Courier => "courier",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserRole::Customer),
            "courier" => Ok(UserRole::Courier),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered account. Couriers additionally carry vehicle details;
/// accounts are soft-deactivated via `is_active`, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub vehicle_type: Option<String>,
    pub plate_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Couriers must have a vehicle type and a normalized plate number.
    pub fn validate_courier_profile(&self) -> Result<(), IdentityError> {
        if self.role != UserRole::Courier {
            return Ok(());
        }
        if self.vehicle_type.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Err(IdentityError::MissingVehicleType);
        }
        match self.plate_number.as_deref() {
            None => Err(IdentityError::MissingPlateNumber),
            Some(p) => normalize_plate(p).map(|_| ()),
        }
    }
}

/// The authenticated actor behind a request. Extracted from the token
/// by the HTTP layer and passed explicitly into every engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("vehicle type is required for couriers")]
    MissingVehicleType,

    #[error("plate number is required for couriers")]
    MissingPlateNumber,

    #[error("plate number must be at least 7 characters")]
    PlateTooShort,
}

/// Trims and uppercases a plate number, enforcing the minimum length.
pub fn normalize_plate(raw: &str) -> Result<String, IdentityError> {
    let plate = raw.trim().to_uppercase();
    if plate.is_empty() {
        return Err(IdentityError::MissingPlateNumber);
    }
    if plate.len() < 7 {
        return Err(IdentityError::PlateTooShort);
    }
    Ok(plate)
}
