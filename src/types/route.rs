//! Route types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Coordinates, StopWithEmployee};

/// Route entity (one vehicle, one shift, one date)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub vehicle_id: Uuid,
    pub shift_id: Uuid,
    pub date: NaiveDate,
    /// Departure: the shift's end time on `date`.
    pub start_time: DateTime<Utc>,
    /// `start_time` plus the caller-supplied duration.
    pub end_time: DateTime<Utc>,
    pub total_distance_km: f64,
    pub total_time_minutes: i32,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Route status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "route_status", rename_all = "snake_case")]
pub enum RouteStatus {
    Active,
    Inactive,
    Cancelled,
}

impl RouteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RouteStatus::Active => "active",
            RouteStatus::Inactive => "inactive",
            RouteStatus::Cancelled => "cancelled",
        }
    }
}

/// Driver-facing status, derived from the route window at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverFacingStatus {
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

/// An (employee, stop) pair in caller-supplied visiting order
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStopPair {
    pub employee_id: Uuid,
    pub stop_id: Uuid,
}

/// Request to create a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    pub name: String,
    pub vehicle_id: Uuid,
    pub shift_id: Uuid,
    pub date: NaiveDate,
    /// Caller-supplied metric from whatever routing the caller used.
    pub total_distance_km: f64,
    /// Caller-supplied duration in minutes, capped at 90.
    pub total_time_minutes: i32,
    /// Stops in the order they will be visited, typically the output of
    /// the sequencer. Persisted as given.
    pub stops: Vec<EmployeeStopPair>,
}

/// Request to update a route's schedule. Stop membership is not touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteRequest {
    pub route_id: Uuid,
    pub name: Option<String>,
    pub vehicle_id: Uuid,
    pub shift_id: Uuid,
    pub date: NaiveDate,
    pub total_distance_km: f64,
    pub total_time_minutes: i32,
}

/// Request identifying a route
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteIdRequest {
    pub route_id: Uuid,
}

/// Request to change a route's status
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRouteStatusRequest {
    pub route_id: Uuid,
    pub status: RouteStatus,
}

/// Request to add or remove a single employee's stop.
///
/// Metrics reflect the re-routed result and are caller-supplied; the worker
/// never recomputes them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStopRequest {
    pub route_id: Uuid,
    pub employee_id: Uuid,
    pub total_distance_km: f64,
    pub total_time_minutes: i32,
}

/// Request to preview the visiting order for a set of employees
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStopsRequest {
    pub employee_ids: Vec<Uuid>,
    /// Explicit origin; falls back to the organization HQ when absent.
    pub origin: Option<Coordinates>,
}

/// Response for a sequencing preview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencedStopsResponse {
    /// Stops in visiting order
    pub stops: Vec<StopWithEmployee>,
    /// The origin the walk actually started from
    pub origin: Option<Coordinates>,
}

/// Request to delegate grouping to the external clustering endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRouteRequest {
    pub employee_ids: Vec<Uuid>,
    pub vehicle_ids: Vec<Uuid>,
}

/// Response carrying a route with its ordered stops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetailResponse {
    pub route: Route,
    pub stops: Vec<StopWithEmployee>,
    pub driver_status: DriverFacingStatus,
}

/// Response for a soft delete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDeletedResponse {
    pub route_id: Uuid,
    pub stops_released: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_status_as_str() {
        assert_eq!(RouteStatus::Active.as_str(), "active");
        assert_eq!(RouteStatus::Inactive.as_str(), "inactive");
        assert_eq!(RouteStatus::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_create_route_request_deserialize() {
        let json = r#"{
            "name": "Bole evening pickup",
            "vehicleId": "123e4567-e89b-12d3-a456-426614174000",
            "shiftId": "123e4567-e89b-12d3-a456-426614174001",
            "date": "2026-02-03",
            "totalDistanceKm": 18.4,
            "totalTimeMinutes": 55,
            "stops": [
                {
                    "employeeId": "123e4567-e89b-12d3-a456-426614174002",
                    "stopId": "123e4567-e89b-12d3-a456-426614174003"
                }
            ]
        }"#;

        let request: CreateRouteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.name, "Bole evening pickup");
        assert_eq!(request.total_time_minutes, 55);
        assert_eq!(request.stops.len(), 1);
    }

    #[test]
    fn test_change_status_rejects_unknown_value() {
        let json = r#"{
            "routeId": "123e4567-e89b-12d3-a456-426614174000",
            "status": "archived"
        }"#;

        let result: Result<ChangeRouteStatusRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_sequence_request_origin_optional() {
        let json = r#"{"employeeIds": []}"#;
        let request: SequenceStopsRequest = serde_json::from_str(json).unwrap();
        assert!(request.origin.is_none());
    }
}
