//! # Branch Records
//!
//! A partner's physical service point as read from the partner/branch
//! directory. Branches are owned by an external CRUD collaborator; the
//! dispatch core only reads them.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::identity::{BranchId, PartnerId};

/// A partner branch with its location and nominal service radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch identifier.
    pub id: BranchId,
    /// Owning partner.
    pub partner_id: PartnerId,
    /// Display name, if the directory provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Latitude in degrees. May be invalid in stored data.
    pub lat: f64,
    /// Longitude in degrees. May be invalid in stored data.
    pub lng: f64,
    /// Nominal service radius in kilometers. Informational only.
    pub service_radius_km: f64,
}

impl Branch {
    /// The branch location, or `None` if the stored coordinates are invalid.
    pub fn location(&self) -> Option<GeoPoint> {
        let point = GeoPoint {
            lat: self.lat,
            lng: self.lng,
        };
        point.is_valid().then_some(point)
    }

    /// Whether this branch belongs to the given partner.
    pub fn belongs_to(&self, partner_id: PartnerId) -> bool {
        self.partner_id == partner_id
    }
}
