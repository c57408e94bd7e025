//! Branch directory persistence.
//!
//! The directory is owned by partner administration; this service only
//! reads it at startup.

use sqlx::PgPool;

use dispatch_core::{Branch, BranchId, PartnerId};

/// Load every branch, ordered by id.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Branch>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BranchRow>(
        "SELECT id, partner_id, name, lat, lng, service_radius_km FROM branches ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(BranchRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct BranchRow {
    id: i64,
    partner_id: i64,
    name: Option<String>,
    lat: f64,
    lng: f64,
    service_radius_km: f64,
}

impl BranchRow {
    /// Coordinates are passed through unchecked; ranking skips invalid ones.
    fn into_record(self) -> Branch {
        Branch {
            id: BranchId::new(self.id),
            partner_id: PartnerId::new(self.partner_id),
            name: self.name,
            lat: self.lat,
            lng: self.lng,
            service_radius_km: self.service_radius_km,
        }
    }
}
