//! Service request persistence (`service_requests`).
//!
//! State machine constraints are enforced by the coordinator, not in SQL.
//! What SQL does enforce is the version guard: an update only lands when
//! the stored row still carries the version the staged change was computed
//! from.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use dispatch_core::{
    BranchId, CategoryId, GeoPoint, PartnerId, PickupOptionId, Rating, RequestId, ServiceId,
};
use dispatch_engine::PendingWrite;
use dispatch_state::{CustomerSnapshot, RequestStatus, ServiceRequest, TimelineEvent};

use super::decode_error;

fn version_param(version: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(version).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Result of [`store_writes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Every write landed.
    Stored,
    /// The row for this request no longer carried the expected version;
    /// the whole transaction was rolled back.
    VersionMismatch(RequestId),
}

/// Store a staged operation's writes in one transaction.
pub async fn store_writes(
    pool: &PgPool,
    writes: &[PendingWrite],
) -> Result<StoreOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for write in writes {
        match write {
            PendingWrite::Insert { request, initial } => {
                insert(&mut *tx, request, initial).await?;
            }
            PendingWrite::Update {
                request,
                expected_version,
                change,
            } => {
                let event = change.as_ref().map(|c| &c.event);
                if !update(&mut *tx, request, *expected_version, event).await? {
                    tx.rollback().await?;
                    return Ok(StoreOutcome::VersionMismatch(request.id));
                }
            }
        }
    }
    tx.commit().await?;
    Ok(StoreOutcome::Stored)
}

/// Insert a new request together with its initial timeline event.
async fn insert(
    conn: &mut PgConnection,
    request: &ServiceRequest,
    initial: &TimelineEvent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO service_requests (
             id, request_number, category_id, service_id, pickup_option_id,
             customer_name, customer_phone, customer_address, customer_lat, customer_lng,
             status, partner_id, branch_id, submitted_at, assigned_at, sla_deadline,
             confirmed_at, rejected_at, in_progress_at, completed_at, closed_at,
             customer_confirmed, rating, feedback, version, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                 $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)",
    )
    .bind(request.id.get())
    .bind(&request.request_number)
    .bind(request.category_id.get())
    .bind(request.service_id.map(|s| s.get()))
    .bind(request.pickup_option_id.map(|p| p.get()))
    .bind(&request.customer.name)
    .bind(&request.customer.phone)
    .bind(&request.customer.address)
    .bind(request.customer.location.lat)
    .bind(request.customer.location.lng)
    .bind(request.status.as_str())
    .bind(request.partner_id.map(|p| p.get()))
    .bind(request.branch_id.map(|b| b.get()))
    .bind(request.submitted_at)
    .bind(request.assigned_at)
    .bind(request.sla_deadline)
    .bind(request.confirmed_at)
    .bind(request.rejected_at)
    .bind(request.in_progress_at)
    .bind(request.completed_at)
    .bind(request.closed_at)
    .bind(request.customer_confirmed)
    .bind(request.rating.map(|r| i16::from(r.get())))
    .bind(request.feedback.as_deref())
    .bind(version_param(request.version)?)
    .bind(request.updated_at)
    .execute(&mut *conn)
    .await?;

    super::timeline::insert(conn, initial).await
}

/// Update a request and, when given, append its new timeline event.
///
/// Returns `false` when no row carried `expected_version`, before the event
/// is written.
async fn update(
    conn: &mut PgConnection,
    request: &ServiceRequest,
    expected_version: u64,
    event: Option<&TimelineEvent>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE service_requests SET
             status = $3, partner_id = $4, branch_id = $5, assigned_at = $6,
             sla_deadline = $7, confirmed_at = $8, rejected_at = $9, in_progress_at = $10,
             completed_at = $11, closed_at = $12, customer_confirmed = $13, rating = $14,
             feedback = $15, version = $16, updated_at = $17
         WHERE id = $1 AND version = $2",
    )
    .bind(request.id.get())
    .bind(version_param(expected_version)?)
    .bind(request.status.as_str())
    .bind(request.partner_id.map(|p| p.get()))
    .bind(request.branch_id.map(|b| b.get()))
    .bind(request.assigned_at)
    .bind(request.sla_deadline)
    .bind(request.confirmed_at)
    .bind(request.rejected_at)
    .bind(request.in_progress_at)
    .bind(request.completed_at)
    .bind(request.closed_at)
    .bind(request.customer_confirmed)
    .bind(request.rating.map(|r| i16::from(r.get())))
    .bind(request.feedback.as_deref())
    .bind(version_param(request.version)?)
    .bind(request.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }
    if let Some(event) = event {
        super::timeline::insert(conn, event).await?;
    }
    Ok(true)
}

/// Load every request, ordered by id.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ServiceRequest>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(
        "SELECT id, request_number, category_id, service_id, pickup_option_id,
                customer_name, customer_phone, customer_address, customer_lat, customer_lng,
                status, partner_id, branch_id, submitted_at, assigned_at, sla_deadline,
                confirmed_at, rejected_at, in_progress_at, completed_at, closed_at,
                customer_confirmed, rating, feedback, version, updated_at
         FROM service_requests ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RequestRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RequestRow {
    id: i64,
    request_number: String,
    category_id: i64,
    service_id: Option<i64>,
    pickup_option_id: Option<i64>,
    customer_name: String,
    customer_phone: String,
    customer_address: String,
    customer_lat: f64,
    customer_lng: f64,
    status: String,
    partner_id: Option<i64>,
    branch_id: Option<i64>,
    submitted_at: DateTime<Utc>,
    assigned_at: Option<DateTime<Utc>>,
    sla_deadline: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    in_progress_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    customer_confirmed: bool,
    rating: Option<i16>,
    feedback: Option<String>,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_record(self) -> Result<ServiceRequest, sqlx::Error> {
        let status = RequestStatus::from_name(&self.status).ok_or_else(|| {
            decode_error(format!("request {}: unknown status {:?}", self.id, self.status))
        })?;
        let rating = self
            .rating
            .map(|r| Rating::new(i64::from(r)))
            .transpose()
            .map_err(|e| decode_error(format!("request {}: {e}", self.id)))?;
        let version = u64::try_from(self.version)
            .map_err(|_| decode_error(format!("request {}: negative version", self.id)))?;

        Ok(ServiceRequest {
            id: RequestId::new(self.id),
            request_number: self.request_number,
            category_id: CategoryId::new(self.category_id),
            service_id: self.service_id.map(ServiceId::new),
            pickup_option_id: self.pickup_option_id.map(PickupOptionId::new),
            customer: CustomerSnapshot {
                name: self.customer_name,
                phone: self.customer_phone,
                address: self.customer_address,
                location: GeoPoint {
                    lat: self.customer_lat,
                    lng: self.customer_lng,
                },
            },
            status,
            partner_id: self.partner_id.map(PartnerId::new),
            branch_id: self.branch_id.map(BranchId::new),
            submitted_at: self.submitted_at,
            assigned_at: self.assigned_at,
            sla_deadline: self.sla_deadline,
            confirmed_at: self.confirmed_at,
            rejected_at: self.rejected_at,
            in_progress_at: self.in_progress_at,
            completed_at: self.completed_at,
            closed_at: self.closed_at,
            customer_confirmed: self.customer_confirmed,
            rating,
            feedback: self.feedback,
            version,
            updated_at: self.updated_at,
        })
    }
}
