//! Stop database queries

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::types::{Stop, StopWithEmployee};

/// Load the stops referenced by a create request, in no particular order
pub async fn list_by_ids(
    pool: &PgPool,
    organization_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Stop>, sqlx::Error> {
    sqlx::query_as::<_, Stop>(
        r#"
        SELECT id, organization_id, employee_id, lat, lng, route_id, sequence,
               estimated_arrival_time, created_at, updated_at
        FROM stops
        WHERE id = ANY($1) AND organization_id = $2
        "#,
    )
    .bind(ids)
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

/// Get the stop owned by an employee
pub async fn find_by_employee(
    pool: &PgPool,
    organization_id: Uuid,
    employee_id: Uuid,
) -> Result<Option<Stop>, sqlx::Error> {
    sqlx::query_as::<_, Stop>(
        r#"
        SELECT id, organization_id, employee_id, lat, lng, route_id, sequence,
               estimated_arrival_time, created_at, updated_at
        FROM stops
        WHERE employee_id = $1 AND organization_id = $2
        "#,
    )
    .bind(employee_id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

/// Stops owned by the given employees, with employee info for previews
pub async fn list_for_employees(
    pool: &PgPool,
    organization_id: Uuid,
    employee_ids: &[Uuid],
) -> Result<Vec<StopWithEmployee>, sqlx::Error> {
    sqlx::query_as::<_, StopWithEmployee>(
        r#"
        SELECT s.id, s.employee_id, e.name AS employee_name,
               e.location AS employee_location,
               s.lat, s.lng, s.sequence, s.estimated_arrival_time
        FROM stops s
        INNER JOIN employees e ON s.employee_id = e.id
        WHERE s.employee_id = ANY($1) AND s.organization_id = $2
        "#,
    )
    .bind(employee_ids)
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

/// Stops of a route with employee info, ordered by sequence
pub async fn list_for_route(
    pool: &PgPool,
    route_id: Uuid,
) -> Result<Vec<StopWithEmployee>, sqlx::Error> {
    sqlx::query_as::<_, StopWithEmployee>(
        r#"
        SELECT s.id, s.employee_id, e.name AS employee_name,
               e.location AS employee_location,
               s.lat, s.lng, s.sequence, s.estimated_arrival_time
        FROM stops s
        LEFT JOIN employees e ON s.employee_id = e.id
        WHERE s.route_id = $1
        ORDER BY s.sequence ASC
        "#,
    )
    .bind(route_id)
    .fetch_all(pool)
    .await
}

/// Number of stops currently attached to a route
pub async fn count_for_route(
    executor: impl PgExecutor<'_>,
    route_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stops WHERE route_id = $1")
        .bind(route_id)
        .fetch_one(executor)
        .await?;

    Ok(count.0)
}

/// Attach a stop to a route at the given 1-based position.
///
/// Conditional on the stop still being unattached: a concurrent attach
/// shows up as zero rows affected and must abort the caller's transaction.
pub async fn attach(
    executor: impl PgExecutor<'_>,
    stop_id: Uuid,
    route_id: Uuid,
    sequence: i32,
    estimated_arrival_time: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE stops
        SET route_id = $2, sequence = $3, estimated_arrival_time = $4, updated_at = NOW()
        WHERE id = $1 AND route_id IS NULL
        "#,
    )
    .bind(stop_id)
    .bind(route_id)
    .bind(sequence)
    .bind(estimated_arrival_time)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Detach a single stop from its route
pub async fn detach(
    executor: impl PgExecutor<'_>,
    stop_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE stops
        SET route_id = NULL, sequence = NULL, estimated_arrival_time = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(stop_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Detach every stop attached to a route
pub async fn detach_all_for_route(
    executor: impl PgExecutor<'_>,
    route_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE stops
        SET route_id = NULL, sequence = NULL, estimated_arrival_time = NULL, updated_at = NOW()
        WHERE route_id = $1
        "#,
    )
    .bind(route_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
