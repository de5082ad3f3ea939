use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flat rate per kilometre, in KES.
pub const RATE_PER_KM: f64 = 1.0;

/// Floor below which no quote ever drops, in KES.
pub const MINIMUM_FEE: f64 = 10.00;

/// Distance assumed when geocoding or routing fails for either end.
pub const DEFAULT_DISTANCE_KM: f64 = 5.0;

/// Quotes a delivery price from the resolved route distance.
///
/// Weight is accepted but deliberately unused: orders record and
/// categorize weight, yet the tariff is distance-only. An unknown
/// distance quotes the minimum fee.
pub fn quote(_weight: f64, distance_km: Option<f64>) -> f64 {
    match distance_km {
        None => MINIMUM_FEE,
        Some(d) => {
            let raw = (d * RATE_PER_KM * 100.0).round() / 100.0;
            raw.max(MINIMUM_FEE)
        }
    }
}

/// Display label derived from weight. Never feeds into the quote.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightCategory {
    Small,
    Medium,
    Large,
    Xlarge,
}

impl WeightCategory {
    pub fn from_weight(weight_kg: f64) -> Self {
        if weight_kg <= 1.0 {
            WeightCategory::Small
        } else if weight_kg <= 5.0 {
            WeightCategory::Medium
        } else if weight_kg <= 10.0 {
            WeightCategory::Large
        } else {
            WeightCategory::Xlarge
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightCategory::Small => "small",
            WeightCategory::Medium => "medium",
            WeightCategory::Large => "large",
            WeightCategory::Xlarge => "xlarge",
        }
    }
}

impl fmt::Display for WeightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(WeightCategory::Small),
            "medium" => Ok(WeightCategory::Medium),
            "large" => Ok(WeightCategory::Large),
            "xlarge" => Ok(WeightCategory::Xlarge),
            other => Err(format!("unknown weight category: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_applies_below_ten_km() {
        assert_eq!(quote(2.5, Some(4.2)), 10.00);
        assert_eq!(quote(2.5, Some(9.99)), 10.00);
    }

    #[test]
    fn long_routes_price_per_km() {
        assert_eq!(quote(1.0, Some(42.0)), 42.00);
        assert_eq!(quote(1.0, Some(12.345)), 12.35);
    }

    #[test]
    fn unknown_or_zero_distance_quotes_minimum() {
        assert_eq!(quote(3.0, None), MINIMUM_FEE);
        assert_eq!(quote(3.0, Some(0.0)), MINIMUM_FEE);
    }

    #[test]
    fn weight_never_affects_the_quote() {
        assert_eq!(quote(0.2, Some(25.0)), quote(80.0, Some(25.0)));
    }

    #[test]
    fn category_thresholds() {
        assert_eq!(WeightCategory::from_weight(0.5), WeightCategory::Small);
        assert_eq!(WeightCategory::from_weight(1.0), WeightCategory::Small);
        assert_eq!(WeightCategory::from_weight(5.0), WeightCategory::Medium);
        assert_eq!(WeightCategory::from_weight(10.0), WeightCategory::Large);
        assert_eq!(WeightCategory::from_weight(10.1), WeightCategory::Xlarge);
    }
}
