//! Route database queries

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::types::{Route, RouteStatus};

/// Get a route scoped to an organization
pub async fn find_route(
    pool: &PgPool,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<Route>, sqlx::Error> {
    sqlx::query_as::<_, Route>(
        r#"
        SELECT id, organization_id, name, vehicle_id, shift_id, date,
               start_time, end_time, total_distance_km, total_time_minutes,
               status, created_at, updated_at
        FROM routes
        WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

/// Insert a new route row, status `active`
#[allow(clippy::too_many_arguments)]
pub async fn insert_route(
    executor: impl PgExecutor<'_>,
    organization_id: Uuid,
    name: &str,
    vehicle_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    total_distance_km: f64,
    total_time_minutes: i32,
) -> Result<Route, sqlx::Error> {
    sqlx::query_as::<_, Route>(
        r#"
        INSERT INTO routes (
            id, organization_id, name, vehicle_id, shift_id, date,
            start_time, end_time, total_distance_km, total_time_minutes,
            status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active', NOW(), NOW())
        RETURNING id, organization_id, name, vehicle_id, shift_id, date,
                  start_time, end_time, total_distance_km, total_time_minutes,
                  status, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(name)
    .bind(vehicle_id)
    .bind(shift_id)
    .bind(date)
    .bind(start_time)
    .bind(end_time)
    .bind(total_distance_km)
    .bind(total_time_minutes)
    .fetch_one(executor)
    .await
}

/// Update a route's schedule and metrics
#[allow(clippy::too_many_arguments)]
pub async fn update_schedule(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    name: &str,
    vehicle_id: Uuid,
    shift_id: Uuid,
    date: NaiveDate,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    total_distance_km: f64,
    total_time_minutes: i32,
) -> Result<Route, sqlx::Error> {
    sqlx::query_as::<_, Route>(
        r#"
        UPDATE routes
        SET name = $2, vehicle_id = $3, shift_id = $4, date = $5,
            start_time = $6, end_time = $7,
            total_distance_km = $8, total_time_minutes = $9,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, organization_id, name, vehicle_id, shift_id, date,
                  start_time, end_time, total_distance_km, total_time_minutes,
                  status, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(vehicle_id)
    .bind(shift_id)
    .bind(date)
    .bind(start_time)
    .bind(end_time)
    .bind(total_distance_km)
    .bind(total_time_minutes)
    .fetch_one(executor)
    .await
}

/// Update caller-supplied metrics after a stop add/remove
pub async fn update_metrics(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    total_distance_km: f64,
    total_time_minutes: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE routes
        SET total_distance_km = $2, total_time_minutes = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(total_distance_km)
    .bind(total_time_minutes)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Set a route's status
pub async fn set_status(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    status: RouteStatus,
) -> Result<Route, sqlx::Error> {
    sqlx::query_as::<_, Route>(
        r#"
        UPDATE routes
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, organization_id, name, vehicle_id, shift_id, date,
                  start_time, end_time, total_distance_km, total_time_minutes,
                  status, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_one(executor)
    .await
}
