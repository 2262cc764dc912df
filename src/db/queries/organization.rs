//! Organization database queries

use sqlx::PgPool;
use uuid::Uuid;

use crate::types::Organization;

/// Get an organization by id
pub async fn find_organization(pool: &PgPool, id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        r#"
        SELECT id, name, hq_lat, hq_lng, created_at, updated_at
        FROM organizations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
