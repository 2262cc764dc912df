//! Route assembly
//!
//! Turns a validated set of (employee, stop) pairs into a scheduled route:
//! every mutating operation validates fail-fast before its first write and
//! then runs as a single transaction, so readers never observe a
//! half-assembled route. `delete_route` is the structural inverse of
//! `create_route`.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::queries;
use crate::defaults::MAX_ROUTE_TIME_MINUTES;
use crate::services::availability;
use crate::services::error::ScheduleError;
use crate::types::{
    CreateRouteRequest, Route, RouteDeletedResponse, RouteStatus, RouteStopRequest,
    UpdateRouteRequest, Vehicle,
};

/// Reject durations beyond the business ceiling, before anything is read
/// or written.
pub fn validate_total_time(total_time_minutes: i32) -> Result<(), ScheduleError> {
    if total_time_minutes < 0 {
        return Err(ScheduleError::InvalidArgument(
            "total time must not be negative".to_string(),
        ));
    }
    if total_time_minutes > MAX_ROUTE_TIME_MINUTES {
        return Err(ScheduleError::InvalidArgument(format!(
            "total time of the route cannot exceed {} minutes",
            MAX_ROUTE_TIME_MINUTES
        )));
    }
    Ok(())
}

/// Derive the route window: departure at the shift's end on `date`,
/// arrival `total_time_minutes` later. Computed over full timestamps so a
/// late shift rolling past midnight stays well-formed.
pub fn route_window(
    date: NaiveDate,
    shift_end: NaiveTime,
    total_time_minutes: i32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_time = date.and_time(shift_end).and_utc();
    let end_time = start_time + Duration::minutes(i64::from(total_time_minutes));
    (start_time, end_time)
}

/// Legal status transitions: active routes can be retired or cancelled,
/// retired routes can be restored. Cancelled is terminal.
pub fn status_transition_allowed(from: RouteStatus, to: RouteStatus) -> bool {
    matches!(
        (from, to),
        (RouteStatus::Active, RouteStatus::Inactive)
            | (RouteStatus::Active, RouteStatus::Cancelled)
            | (RouteStatus::Inactive, RouteStatus::Active)
    )
}

async fn load_shift(
    pool: &PgPool,
    organization_id: Uuid,
    shift_id: Uuid,
) -> Result<crate::types::Shift, ScheduleError> {
    queries::shift::find_shift(pool, organization_id, shift_id)
        .await?
        .ok_or_else(|| ScheduleError::NotFound("shift not found".to_string()))
}

async fn load_vehicle(
    pool: &PgPool,
    organization_id: Uuid,
    vehicle_id: Uuid,
) -> Result<Vehicle, ScheduleError> {
    queries::vehicle::find_vehicle(pool, organization_id, vehicle_id)
        .await?
        .ok_or_else(|| ScheduleError::NotFound("vehicle not found".to_string()))
}

async fn load_route(
    pool: &PgPool,
    organization_id: Uuid,
    route_id: Uuid,
) -> Result<Route, ScheduleError> {
    queries::route::find_route(pool, organization_id, route_id)
        .await?
        .ok_or_else(|| ScheduleError::NotFound("route not found".to_string()))
}

/// Create a route from (employee, stop) pairs in caller-supplied visiting
/// order.
///
/// Validation order: duration ceiling, shift, vehicle + driver,
/// availability, pair list, employees free, stops attachable. Only then
/// does the atomic unit run: route row, per-pair attach + assign (each
/// re-checked at write time), availability reservation.
pub async fn create_route(
    pool: &PgPool,
    organization_id: Uuid,
    request: &CreateRouteRequest,
) -> Result<Route, ScheduleError> {
    validate_total_time(request.total_time_minutes)?;

    let shift = load_shift(pool, organization_id, request.shift_id).await?;
    let (start_time, end_time) =
        route_window(request.date, shift.end_time, request.total_time_minutes);

    let vehicle = load_vehicle(pool, organization_id, request.vehicle_id).await?;
    let driver_id = vehicle.driver_id.ok_or_else(|| {
        ScheduleError::InvalidState("vehicle has no assigned driver".to_string())
    })?;

    let check = availability::check_overlap(
        pool,
        request.vehicle_id,
        request.shift_id,
        request.date,
        start_time,
        end_time,
        None,
    )
    .await?;
    if !check.available {
        return Err(ScheduleError::Conflict(check.reason.unwrap_or_else(|| {
            "vehicle is not available for this time slot".to_string()
        })));
    }

    if request.stops.is_empty() {
        return Err(ScheduleError::InvalidArgument(
            "no employees provided for the route".to_string(),
        ));
    }
    if request.stops.len() > vehicle.capacity.max(0) as usize {
        return Err(ScheduleError::CapacityExceeded {
            capacity: vehicle.capacity,
        });
    }

    let employee_ids: Vec<Uuid> = request.stops.iter().map(|pair| pair.employee_id).collect();
    let stop_ids: Vec<Uuid> = request.stops.iter().map(|pair| pair.stop_id).collect();

    let unassigned =
        queries::employee::list_unassigned(pool, organization_id, &employee_ids).await?;
    if unassigned.len() != employee_ids.len() {
        return Err(ScheduleError::Conflict(format!(
            "some employees are already assigned to other routes or unknown: \
             requested {}, available {}, unavailable {}",
            employee_ids.len(),
            unassigned.len(),
            employee_ids.len() - unassigned.len(),
        )));
    }

    let stops = queries::stop::list_by_ids(pool, organization_id, &stop_ids).await?;
    let stops_by_id: HashMap<Uuid, _> = stops.iter().map(|stop| (stop.id, stop)).collect();
    let matched = request
        .stops
        .iter()
        .filter(|pair| {
            stops_by_id.get(&pair.stop_id).is_some_and(|stop| {
                stop.employee_id == Some(pair.employee_id) && stop.route_id.is_none()
            })
        })
        .count();
    if matched != request.stops.len() {
        return Err(ScheduleError::Conflict(format!(
            "some stops do not exist, do not belong to their paired employee, \
             or are already attached to a route: expected {}, matched {}",
            request.stops.len(),
            matched,
        )));
    }

    // Atomic unit. Any error below drops the transaction and rolls back.
    let mut tx = pool.begin().await?;

    let route = queries::route::insert_route(
        &mut *tx,
        organization_id,
        &request.name,
        request.vehicle_id,
        request.shift_id,
        request.date,
        start_time,
        end_time,
        request.total_distance_km,
        request.total_time_minutes,
    )
    .await?;

    let now = Utc::now();
    for (position, pair) in request.stops.iter().enumerate() {
        let attached =
            queries::stop::attach(&mut *tx, pair.stop_id, route.id, (position + 1) as i32, now)
                .await?;
        if attached == 0 {
            return Err(ScheduleError::Conflict(
                "a stop was attached to another route concurrently".to_string(),
            ));
        }

        let assigned = queries::employee::mark_assigned(&mut *tx, pair.employee_id).await?;
        if assigned == 0 {
            return Err(ScheduleError::Conflict(
                "an employee was assigned to another route concurrently".to_string(),
            ));
        }
    }

    availability::reserve(
        &mut *tx,
        organization_id,
        request.vehicle_id,
        request.shift_id,
        request.date,
        driver_id,
        start_time,
        end_time,
        route.id,
    )
    .await?;

    tx.commit().await?;

    info!(route_id = %route.id, stops = request.stops.len(), "route created");
    Ok(route)
}

/// Re-schedule a route onto a (possibly different) vehicle/shift/date.
///
/// Runs the same validation chain as creation, with the route's own
/// reservation excluded from the overlap scan so an in-place time edit is
/// never rejected by itself. Stop membership is untouched. When the key
/// changes, the old slot is released in the same transaction that
/// reserves the new one.
pub async fn update_route(
    pool: &PgPool,
    organization_id: Uuid,
    request: &UpdateRouteRequest,
) -> Result<Route, ScheduleError> {
    validate_total_time(request.total_time_minutes)?;

    let existing = load_route(pool, organization_id, request.route_id).await?;

    let shift = load_shift(pool, organization_id, request.shift_id).await?;
    let (start_time, end_time) =
        route_window(request.date, shift.end_time, request.total_time_minutes);

    let vehicle = load_vehicle(pool, organization_id, request.vehicle_id).await?;
    let driver_id = vehicle.driver_id.ok_or_else(|| {
        ScheduleError::InvalidState("vehicle has no assigned driver".to_string())
    })?;

    let check = availability::check_overlap(
        pool,
        request.vehicle_id,
        request.shift_id,
        request.date,
        start_time,
        end_time,
        Some(existing.id),
    )
    .await?;
    if !check.available {
        return Err(ScheduleError::Conflict(check.reason.unwrap_or_else(|| {
            "vehicle is not available for this time slot".to_string()
        })));
    }

    let name = request.name.as_deref().unwrap_or(&existing.name);
    let key_changed = existing.vehicle_id != request.vehicle_id
        || existing.shift_id != request.shift_id
        || existing.date != request.date;

    let mut tx = pool.begin().await?;

    let route = queries::route::update_schedule(
        &mut *tx,
        existing.id,
        name,
        request.vehicle_id,
        request.shift_id,
        request.date,
        start_time,
        end_time,
        request.total_distance_km,
        request.total_time_minutes,
    )
    .await?;

    if key_changed {
        availability::release(&mut *tx, existing.vehicle_id, existing.shift_id, existing.date)
            .await?;
    }

    availability::reserve(
        &mut *tx,
        organization_id,
        request.vehicle_id,
        request.shift_id,
        request.date,
        driver_id,
        start_time,
        end_time,
        route.id,
    )
    .await?;

    tx.commit().await?;

    info!(route_id = %route.id, key_changed = key_changed, "route schedule updated");
    Ok(route)
}

/// Soft-delete a route: the exact inverse of creation's mutating step.
///
/// Atomically unassigns every owning employee, releases the availability
/// slot, detaches all stops, and parks the route as inactive.
pub async fn delete_route(
    pool: &PgPool,
    organization_id: Uuid,
    route_id: Uuid,
) -> Result<RouteDeletedResponse, ScheduleError> {
    let route = load_route(pool, organization_id, route_id).await?;
    if route.status == RouteStatus::Inactive {
        return Err(ScheduleError::InvalidState(
            "route is already inactive".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Employees first: the subquery walks stops.route_id, which the
    // detach below nulls out.
    queries::employee::unassign_for_route(&mut *tx, route.id).await?;
    availability::release(&mut *tx, route.vehicle_id, route.shift_id, route.date).await?;
    let stops_released = queries::stop::detach_all_for_route(&mut *tx, route.id).await?;
    queries::route::set_status(&mut *tx, route.id, RouteStatus::Inactive).await?;

    tx.commit().await?;

    info!(route_id = %route.id, stops_released, "route soft-deleted");
    Ok(RouteDeletedResponse {
        route_id: route.id,
        stops_released: stops_released as i64,
    })
}

/// Restore a soft-deleted route. Only the status flips back; stops and
/// employees are not re-attached and no slot is re-reserved.
pub async fn restore_route(
    pool: &PgPool,
    organization_id: Uuid,
    route_id: Uuid,
) -> Result<Route, ScheduleError> {
    let route = load_route(pool, organization_id, route_id).await?;
    if route.status != RouteStatus::Inactive {
        return Err(ScheduleError::InvalidState(
            "route is not inactive".to_string(),
        ));
    }

    let restored = queries::route::set_status(pool, route.id, RouteStatus::Active).await?;
    Ok(restored)
}

/// Attach an employee's stop at the end of a route, capacity permitting.
/// Metrics for the re-routed result come from the caller.
pub async fn add_stop(
    pool: &PgPool,
    organization_id: Uuid,
    request: &RouteStopRequest,
) -> Result<Route, ScheduleError> {
    validate_total_time(request.total_time_minutes)?;

    let route = load_route(pool, organization_id, request.route_id).await?;
    let vehicle = load_vehicle(pool, organization_id, route.vehicle_id).await?;

    let employee = queries::employee::find_employee(pool, organization_id, request.employee_id)
        .await?
        .ok_or_else(|| ScheduleError::NotFound("employee not found".to_string()))?;
    if employee.assigned {
        return Err(ScheduleError::Conflict(
            "employee is already assigned to a route".to_string(),
        ));
    }

    let stop = queries::stop::find_by_employee(pool, organization_id, employee.id)
        .await?
        .ok_or_else(|| {
            ScheduleError::NotFound("employee does not have an associated stop".to_string())
        })?;
    if stop.route_id.is_some() {
        return Err(ScheduleError::Conflict(
            "stop is already attached to a route".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Count inside the transaction so a concurrent add sees the capacity
    // gate too.
    let count = queries::stop::count_for_route(&mut *tx, route.id).await?;
    if count >= i64::from(vehicle.capacity) {
        return Err(ScheduleError::CapacityExceeded {
            capacity: vehicle.capacity,
        });
    }

    let attached =
        queries::stop::attach(&mut *tx, stop.id, route.id, (count + 1) as i32, Utc::now()).await?;
    if attached == 0 {
        return Err(ScheduleError::Conflict(
            "stop was attached to another route concurrently".to_string(),
        ));
    }

    let assigned = queries::employee::mark_assigned(&mut *tx, employee.id).await?;
    if assigned == 0 {
        return Err(ScheduleError::Conflict(
            "employee was assigned to another route concurrently".to_string(),
        ));
    }

    queries::route::update_metrics(
        &mut *tx,
        route.id,
        request.total_distance_km,
        request.total_time_minutes,
    )
    .await?;

    tx.commit().await?;

    load_route(pool, organization_id, route.id).await
}

/// Detach an employee's stop from a route and unassign the employee.
/// Metrics for the now-shorter route come from the caller.
pub async fn remove_stop(
    pool: &PgPool,
    organization_id: Uuid,
    request: &RouteStopRequest,
) -> Result<Route, ScheduleError> {
    let route = load_route(pool, organization_id, request.route_id).await?;

    let employee = queries::employee::find_employee(pool, organization_id, request.employee_id)
        .await?
        .ok_or_else(|| ScheduleError::NotFound("employee not found".to_string()))?;

    let stop = queries::stop::find_by_employee(pool, organization_id, employee.id)
        .await?
        .ok_or_else(|| {
            ScheduleError::NotFound("employee does not have an associated stop".to_string())
        })?;
    if stop.route_id != Some(route.id) {
        return Err(ScheduleError::NotFound(
            "stop not found in the specified route".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    queries::stop::detach(&mut *tx, stop.id).await?;
    queries::employee::mark_unassigned(&mut *tx, employee.id).await?;
    queries::route::update_metrics(
        &mut *tx,
        route.id,
        request.total_distance_km,
        request.total_time_minutes,
    )
    .await?;

    tx.commit().await?;

    load_route(pool, organization_id, route.id).await
}

/// Change a route's management status, validating the transition before
/// any write. Same-status calls are a no-op.
pub async fn change_status(
    pool: &PgPool,
    organization_id: Uuid,
    route_id: Uuid,
    status: RouteStatus,
) -> Result<Route, ScheduleError> {
    let route = load_route(pool, organization_id, route_id).await?;

    if route.status == status {
        return Ok(route);
    }
    if !status_transition_allowed(route.status, status) {
        return Err(ScheduleError::InvalidState(format!(
            "cannot change route status from {} to {}",
            route.status.as_str(),
            status.as_str(),
        )));
    }

    let updated = queries::route::set_status(pool, route.id, status).await?;
    info!(route_id = %updated.id, status = updated.status.as_str(), "route status changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Duration ceiling
    // -----------------------------------------------------------------------
    #[test]
    fn total_time_at_ceiling_is_accepted() {
        assert!(validate_total_time(90).is_ok());
        assert!(validate_total_time(0).is_ok());
        assert!(validate_total_time(45).is_ok());
    }

    #[test]
    fn total_time_over_ceiling_is_rejected() {
        let error = validate_total_time(91).unwrap_err();
        assert!(matches!(error, ScheduleError::InvalidArgument(_)));
    }

    #[test]
    fn negative_total_time_is_rejected() {
        assert!(validate_total_time(-1).is_err());
    }

    // -----------------------------------------------------------------------
    // Route window derivation
    // -----------------------------------------------------------------------
    #[test]
    fn window_starts_at_shift_end() {
        use chrono::TimeZone;

        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let shift_end = NaiveTime::from_hms_opt(17, 0, 0).unwrap();

        let (start, end) = route_window(date, shift_end, 45);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 3, 17, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 3, 17, 45, 0).unwrap());
    }

    #[test]
    fn window_crossing_midnight_lands_on_next_day() {
        use chrono::TimeZone;

        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let shift_end = NaiveTime::from_hms_opt(23, 30, 0).unwrap();

        let (start, end) = route_window(date, shift_end, 90);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 3, 23, 30, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 4, 1, 0, 0).unwrap());
    }

    #[test]
    fn zero_duration_window_is_empty() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let shift_end = NaiveTime::from_hms_opt(17, 0, 0).unwrap();

        let (start, end) = route_window(date, shift_end, 0);
        assert_eq!(start, end);
    }

    // -----------------------------------------------------------------------
    // Status transitions
    // -----------------------------------------------------------------------
    #[test]
    fn active_can_retire_or_cancel() {
        assert!(status_transition_allowed(RouteStatus::Active, RouteStatus::Inactive));
        assert!(status_transition_allowed(RouteStatus::Active, RouteStatus::Cancelled));
    }

    #[test]
    fn inactive_can_only_restore() {
        assert!(status_transition_allowed(RouteStatus::Inactive, RouteStatus::Active));
        assert!(!status_transition_allowed(RouteStatus::Inactive, RouteStatus::Cancelled));
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(!status_transition_allowed(RouteStatus::Cancelled, RouteStatus::Active));
        assert!(!status_transition_allowed(RouteStatus::Cancelled, RouteStatus::Inactive));
    }
}
