//! Shift database queries

use sqlx::PgPool;
use uuid::Uuid;

use crate::types::Shift;

/// Get a shift scoped to an organization
pub async fn find_shift(
    pool: &PgPool,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<Shift>, sqlx::Error> {
    sqlx::query_as::<_, Shift>(
        r#"
        SELECT id, organization_id, name, start_time, end_time, created_at, updated_at
        FROM shifts
        WHERE id = $1 AND organization_id = $2
        "#,
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}
