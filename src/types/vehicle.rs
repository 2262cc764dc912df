//! Vehicle and driver types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Vehicle entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub plate_number: String,
    /// Maximum stop count a route on this vehicle may hold.
    pub capacity: i32,
    /// A vehicle without a driver cannot be scheduled.
    pub driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Driver entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for vehicles free to take a route on a shift/date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVehiclesRequest {
    pub shift_id: Uuid,
    pub date: chrono::NaiveDate,
    /// Proposed route duration, used to derive the time window to test.
    pub total_time_minutes: i32,
}

/// Response for the available-vehicles query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVehiclesResponse {
    pub vehicles: Vec<Vehicle>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_serialize() {
        let vehicle = Vehicle {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            plate_number: "A-12345".to_string(),
            capacity: 12,
            driver_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&vehicle).unwrap();
        assert!(json.contains("\"plateNumber\":\"A-12345\""));
        assert!(json.contains("\"capacity\":12"));
        assert!(json.contains("\"driverId\":null"));
    }

    #[test]
    fn test_available_vehicles_request_deserialize() {
        let json = r#"{
            "shiftId": "123e4567-e89b-12d3-a456-426614174000",
            "date": "2026-02-03",
            "totalTimeMinutes": 45
        }"#;

        let request: AvailableVehiclesRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.total_time_minutes, 45);
    }
}
