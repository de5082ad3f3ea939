use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A resolved point on the map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Route estimate between two points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_text: String,
}

/// Resolves a free-text address to coordinates. Any provider failure
/// collapses to `None`; callers fall back per the pricing rules.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Option<Coordinates>;
}

/// Computes route distance between two coordinate pairs. `None` on any
/// provider failure or empty result.
#[async_trait]
pub trait DistanceMatrix: Send + Sync {
    async fn route(&self, origin: Coordinates, destination: Coordinates) -> Option<RouteEstimate>;
}

/// Table-driven geocoder. An empty table resolves nothing, which makes
/// it double as the null adapter when no provider is configured.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, Coordinates>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, coords: Coordinates) -> Self {
        self.entries.insert(address.to_string(), coords);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Option<Coordinates> {
        let hit = self.entries.get(address).copied();
        if hit.is_none() {
            tracing::debug!(%address, "geocoding returned no result");
        }
        hit
    }
}

/// Fixed-answer distance matrix for tests and unconfigured deployments.
#[derive(Debug, Default)]
pub struct StaticDistanceMatrix {
    distance_km: Option<f64>,
}

impl StaticDistanceMatrix {
    pub fn unavailable() -> Self {
        Self { distance_km: None }
    }

    pub fn fixed(distance_km: f64) -> Self {
        Self { distance_km: Some(distance_km) }
    }
}

#[async_trait]
impl DistanceMatrix for StaticDistanceMatrix {
    async fn route(&self, _origin: Coordinates, _destination: Coordinates) -> Option<RouteEstimate> {
        self.distance_km.map(|distance_km| RouteEstimate {
            distance_km,
            duration_text: format!("{} mins", (distance_km * 2.0).round() as i64),
        })
    }
}
