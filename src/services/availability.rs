//! Vehicle availability ledger
//!
//! One reservation record per (vehicle, shift, date). The unique key on
//! that triple plus single-statement upsert makes the storage layer the
//! serialization point for concurrent scheduling; no in-process locking.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::queries;
use crate::types::{AvailabilityCheck, AvailabilityRecord, Vehicle};

/// Half-open window intersection: [a_start, a_end) vs [b_start, b_end).
/// Windows that only touch at an endpoint do not conflict.
pub fn windows_conflict(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Check whether a vehicle can take the proposed window on (shift, date).
///
/// A missing record means available. `exclude_route` skips that route's
/// own reservation so an in-place schedule edit is not rejected by itself.
pub async fn check_overlap(
    pool: &PgPool,
    vehicle_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    proposed_start: DateTime<Utc>,
    proposed_end: DateTime<Utc>,
    exclude_route: Option<Uuid>,
) -> Result<AvailabilityCheck, sqlx::Error> {
    let conflicts = queries::availability::find_conflicting(
        pool,
        vehicle_id,
        shift_id,
        date,
        proposed_start,
        proposed_end,
        exclude_route,
    )
    .await?;

    if let Some(record) = conflicts.first() {
        return Ok(AvailabilityCheck::unavailable(format!(
            "vehicle is reserved from {} to {} on {}",
            record.start_time.format("%H:%M"),
            record.end_time.format("%H:%M"),
            record.date,
        )));
    }

    Ok(AvailabilityCheck::available())
}

/// Reserve the slot for a route. Runs on the caller's executor so it joins
/// the surrounding transaction; converges to the same record when called
/// twice for one key.
#[allow(clippy::too_many_arguments)]
pub async fn reserve(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    vehicle_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    driver_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    route_id: Uuid,
) -> Result<AvailabilityRecord, sqlx::Error> {
    queries::availability::upsert_reservation(
        executor,
        organization_id,
        vehicle_id,
        shift_id,
        date,
        driver_id,
        start_time,
        end_time,
        route_id,
    )
    .await
}

/// Flip the slot back to available on route deletion/cancellation.
/// Matches every record for the key, broad on purpose, so legacy rows
/// from the same scheduling window are released together.
pub async fn release(
    executor: impl PgExecutor<'_>,
    vehicle_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
) -> Result<u64, sqlx::Error> {
    queries::availability::release(executor, vehicle_id, shift_id, date).await
}

/// Vehicles with a driver and no conflicting reservation for the window
pub async fn find_available_vehicles(
    pool: &PgPool,
    organization_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<Vec<Vehicle>, sqlx::Error> {
    queries::vehicle::list_available_for_window(
        pool,
        organization_id,
        shift_id,
        date,
        start_time,
        end_time,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_overlapping_windows_conflict() {
        assert!(windows_conflict(at(17, 0), at(18, 0), at(17, 30), at(18, 30)));
        assert!(windows_conflict(at(17, 30), at(18, 30), at(17, 0), at(18, 0)));
    }

    #[test]
    fn test_contained_window_conflicts() {
        assert!(windows_conflict(at(17, 0), at(19, 0), at(17, 30), at(18, 0)));
        assert!(windows_conflict(at(17, 30), at(18, 0), at(17, 0), at(19, 0)));
    }

    #[test]
    fn test_identical_windows_conflict() {
        assert!(windows_conflict(at(17, 0), at(18, 0), at(17, 0), at(18, 0)));
    }

    #[test]
    fn test_touching_windows_do_not_conflict() {
        // One ends exactly when the other starts.
        assert!(!windows_conflict(at(17, 0), at(18, 0), at(18, 0), at(19, 0)));
        assert!(!windows_conflict(at(18, 0), at(19, 0), at(17, 0), at(18, 0)));
    }

    #[test]
    fn test_disjoint_windows_do_not_conflict() {
        assert!(!windows_conflict(at(8, 0), at(9, 0), at(17, 0), at(18, 0)));
    }
}
