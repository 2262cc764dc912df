//! Vehicle availability database queries

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::types::AvailabilityRecord;

/// Reservations on the (vehicle, shift, date) key whose window intersects
/// the half-open interval [start_time, end_time).
///
/// `exclude_route` skips the reservation held by that route, so a schedule
/// update is not rejected by its own prior reservation.
pub async fn find_conflicting(
    pool: &PgPool,
    vehicle_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude_route: Option<Uuid>,
) -> Result<Vec<AvailabilityRecord>, sqlx::Error> {
    sqlx::query_as::<_, AvailabilityRecord>(
        r#"
        SELECT id, organization_id, vehicle_id, shift_id, date, driver_id,
               start_time, end_time, available, route_id, created_at, updated_at
        FROM vehicle_availability
        WHERE vehicle_id = $1
          AND shift_id = $2
          AND date = $3
          AND available = FALSE
          AND start_time < $5
          AND end_time > $4
          AND ($6::uuid IS NULL OR route_id IS DISTINCT FROM $6)
        "#,
    )
    .bind(vehicle_id)
    .bind(shift_id)
    .bind(date)
    .bind(start_time)
    .bind(end_time)
    .bind(exclude_route)
    .fetch_all(pool)
    .await
}

/// Reserve the (vehicle, shift, date) slot for a route.
///
/// Single-statement upsert on the unique key, the storage-level
/// serialization point for concurrent reservations. Idempotent per key.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_reservation(
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
    sqlx::query_as::<_, AvailabilityRecord>(
        r#"
        INSERT INTO vehicle_availability (
            id, organization_id, vehicle_id, shift_id, date, driver_id,
            start_time, end_time, available, route_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9, NOW(), NOW())
        ON CONFLICT (vehicle_id, shift_id, date)
        DO UPDATE SET
            driver_id = $6,
            start_time = $7,
            end_time = $8,
            available = FALSE,
            route_id = $9,
            updated_at = NOW()
        RETURNING id, organization_id, vehicle_id, shift_id, date, driver_id,
                  start_time, end_time, available, route_id, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(vehicle_id)
    .bind(shift_id)
    .bind(date)
    .bind(driver_id)
    .bind(start_time)
    .bind(end_time)
    .bind(route_id)
    .fetch_one(executor)
    .await
}

/// Release every reservation on the (vehicle, shift, date) key
pub async fn release(
    executor: impl PgExecutor<'_>,
    vehicle_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE vehicle_availability
        SET available = TRUE, route_id = NULL, updated_at = NOW()
        WHERE vehicle_id = $1 AND shift_id = $2 AND date = $3
        "#,
    )
    .bind(vehicle_id)
    .bind(shift_id)
    .bind(date)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
