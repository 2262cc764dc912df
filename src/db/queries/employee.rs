//! Employee database queries

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::types::Employee;

/// Get an employee scoped to an organization
pub async fn find_employee(
    pool: &PgPool,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, organization_id, name, location, assigned, created_at, updated_at
        FROM employees
        WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

/// Ids from the given set that are currently unassigned (and in the org)
pub async fn list_unassigned(
    pool: &PgPool,
    organization_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id
        FROM employees
        WHERE id = ANY($1) AND organization_id = $2 AND assigned = FALSE
        "#,
    )
    .bind(ids)
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Mark an employee assigned. Conditional on the current value so a
/// concurrent assignment shows up as zero rows affected.
pub async fn mark_assigned(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE employees SET assigned = TRUE, updated_at = NOW() WHERE id = $1 AND assigned = FALSE",
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Mark an employee unassigned
pub async fn mark_unassigned(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE employees SET assigned = FALSE, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Unassign every employee whose stop is attached to the given route
pub async fn unassign_for_route(
    executor: impl PgExecutor<'_>,
    route_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE employees
        SET assigned = FALSE, updated_at = NOW()
        WHERE id IN (
            SELECT employee_id FROM stops
            WHERE route_id = $1 AND employee_id IS NOT NULL
        )
        "#,
    )
    .bind(route_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
