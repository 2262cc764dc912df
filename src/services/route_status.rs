//! Driver-facing route status
//!
//! Management status says whether a route is on the schedule at all;
//! drivers care where it sits relative to now. Derived at read time,
//! never stored.

use chrono::{DateTime, Duration, Utc};

use crate::types::{DriverFacingStatus, Route, RouteStatus};

/// Routes light up for drivers this long before departure.
const ACTIVATION_WINDOW_MINUTES: i64 = 120;

/// Derive the driver-facing status from the route window.
///
/// Cancellation overrides everything. A soft-deleted (inactive) route
/// reads as completed. Otherwise the timeline decides: upcoming before
/// the activation window, active inside it, completed after the window
/// closes.
pub fn derive_driver_status(route: &Route, now: DateTime<Utc>) -> DriverFacingStatus {
    if route.status == RouteStatus::Cancelled {
        return DriverFacingStatus::Cancelled;
    }
    if route.status == RouteStatus::Inactive {
        return DriverFacingStatus::Completed;
    }

    let window = Duration::minutes(ACTIVATION_WINDOW_MINUTES);
    if now < route.start_time - window {
        return DriverFacingStatus::Upcoming;
    }
    if now <= route.end_time {
        return DriverFacingStatus::Active;
    }

    DriverFacingStatus::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;

    fn route_with(status: RouteStatus) -> Route {
        Route {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            name: "Evening pickup".to_string(),
            vehicle_id: Uuid::nil(),
            shift_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            start_time: Utc.with_ymd_and_hms(2026, 2, 3, 17, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 2, 3, 18, 0, 0).unwrap(),
            total_distance_km: 12.0,
            total_time_minutes: 60,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_cancelled_overrides_timeline() {
        let route = route_with(RouteStatus::Cancelled);
        assert_eq!(
            derive_driver_status(&route, at(17, 30)),
            DriverFacingStatus::Cancelled
        );
    }

    #[test]
    fn test_inactive_reads_as_completed() {
        let route = route_with(RouteStatus::Inactive);
        assert_eq!(
            derive_driver_status(&route, at(10, 0)),
            DriverFacingStatus::Completed
        );
    }

    #[test]
    fn test_upcoming_before_activation_window() {
        let route = route_with(RouteStatus::Active);
        // Departure 17:00; window opens at 15:00.
        assert_eq!(
            derive_driver_status(&route, at(14, 59)),
            DriverFacingStatus::Upcoming
        );
    }

    #[test]
    fn test_active_inside_window() {
        let route = route_with(RouteStatus::Active);
        assert_eq!(
            derive_driver_status(&route, at(15, 0)),
            DriverFacingStatus::Active
        );
        assert_eq!(
            derive_driver_status(&route, at(17, 30)),
            DriverFacingStatus::Active
        );
        assert_eq!(
            derive_driver_status(&route, at(18, 0)),
            DriverFacingStatus::Active
        );
    }

    #[test]
    fn test_completed_after_end() {
        let route = route_with(RouteStatus::Active);
        assert_eq!(
            derive_driver_status(&route, at(18, 1)),
            DriverFacingStatus::Completed
        );
    }
}
