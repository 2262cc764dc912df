//! Stop types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Both components finite and within geographic range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }

    /// Build a coordinate pair from optional columns. Anything non-finite
    /// or out of range counts as absent.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => {
                let coords = Self { lat, lng };
                coords.is_valid().then_some(coords)
            }
            _ => None,
        }
    }
}

/// Stop entity: a pickup point owned by at most one employee
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Null while the stop is not attached to any route.
    pub route_id: Option<Uuid>,
    /// 1-based position within the route. Set iff `route_id` is set.
    pub sequence: Option<i32>,
    pub estimated_arrival_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stop {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.lat, self.lng)
    }
}

/// Stop joined with its owning employee, for route detail and map views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StopWithEmployee {
    pub id: Uuid,
    pub employee_id: Option<Uuid>,
    pub employee_name: Option<String>,
    pub employee_location: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub sequence: Option<i32>,
    pub estimated_arrival_time: Option<DateTime<Utc>>,
}

impl StopWithEmployee {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates { lat: 9.02, lng: 38.76 }.is_valid());
        assert!(!Coordinates { lat: f64::NAN, lng: 38.76 }.is_valid());
        assert!(!Coordinates { lat: 91.0, lng: 38.76 }.is_valid());
        assert!(!Coordinates { lat: 9.02, lng: 181.0 }.is_valid());
        assert!(!Coordinates { lat: f64::INFINITY, lng: 0.0 }.is_valid());
    }

    #[test]
    fn test_coordinates_from_parts() {
        assert!(Coordinates::from_parts(Some(9.02), Some(38.76)).is_some());
        assert!(Coordinates::from_parts(None, Some(38.76)).is_none());
        assert!(Coordinates::from_parts(Some(f64::NAN), Some(38.76)).is_none());
        assert!(Coordinates::from_parts(None, None).is_none());
    }

    #[test]
    fn test_stop_coordinates_requires_both_columns() {
        let stop = Stop {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            employee_id: None,
            lat: Some(9.02),
            lng: None,
            route_id: None,
            sequence: None,
            estimated_arrival_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(stop.coordinates().is_none());
    }
}
