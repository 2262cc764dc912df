//! Organization types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Coordinates;

/// Organization entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub hq_lat: Option<f64>,
    pub hq_lng: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Headquarters coordinate, the default sequencing origin.
    pub fn hq_coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.hq_lat, self.hq_lng)
    }
}
