//! Vehicle database queries

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::Vehicle;

/// Get a vehicle scoped to an organization
pub async fn find_vehicle(
    pool: &PgPool,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, organization_id, plate_number, capacity, driver_id, created_at, updated_at
        FROM vehicles
        WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

/// Load a set of vehicles by id
pub async fn list_by_ids(
    pool: &PgPool,
    organization_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, organization_id, plate_number, capacity, driver_id, created_at, updated_at
        FROM vehicles
        WHERE id = ANY($1) AND organization_id = $2
        "#,
    )
    .bind(ids)
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

/// List vehicles with a driver and no reservation conflicting with the
/// proposed window on (shift, date).
pub async fn list_available_for_window(
    pool: &PgPool,
    organization_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<Vec<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT v.id, v.organization_id, v.plate_number, v.capacity, v.driver_id,
               v.created_at, v.updated_at
        FROM vehicles v
        WHERE v.organization_id = $1
          AND v.driver_id IS NOT NULL
          AND NOT EXISTS (
              SELECT 1
              FROM vehicle_availability va
              WHERE va.vehicle_id = v.id
                AND va.shift_id = $2
                AND va.date = $3
                AND va.available = FALSE
                AND va.start_time < $5
                AND va.end_time > $4
          )
        ORDER BY v.plate_number ASC
        "#,
    )
    .bind(organization_id)
    .bind(shift_id)
    .bind(date)
    .bind(start_time)
    .bind(end_time)
    .fetch_all(pool)
    .await
}
