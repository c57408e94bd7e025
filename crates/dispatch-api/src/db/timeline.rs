//! Timeline persistence (`request_timeline`). Rows are only ever inserted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use dispatch_core::{ActorRole, RequestId};
use dispatch_state::{RequestStatus, TimelineEvent};

use super::decode_error;

/// Append one event on an open connection or transaction.
pub async fn insert(conn: &mut PgConnection, event: &TimelineEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO request_timeline (request_id, status, occurred_at, actor_id, actor_role, notes)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(event.request_id.get())
    .bind(event.status.as_str())
    .bind(event.timestamp)
    .bind(event.actor_id.as_deref())
    .bind(event.actor_role.map(|r| r.as_str()))
    .bind(event.notes.as_deref())
    .execute(conn)
    .await?;
    Ok(())
}

/// Load every event grouped by request, each group in recorded order.
pub async fn load_all(
    pool: &PgPool,
) -> Result<HashMap<RequestId, Vec<TimelineEvent>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TimelineRow>(
        "SELECT request_id, status, occurred_at, actor_id, actor_role, notes
         FROM request_timeline ORDER BY request_id, occurred_at, id",
    )
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<RequestId, Vec<TimelineEvent>> = HashMap::new();
    for row in rows {
        let event = row.into_record()?;
        grouped.entry(event.request_id).or_default().push(event);
    }
    Ok(grouped)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TimelineRow {
    request_id: i64,
    status: String,
    occurred_at: DateTime<Utc>,
    actor_id: Option<String>,
    actor_role: Option<String>,
    notes: Option<String>,
}

impl TimelineRow {
    fn into_record(self) -> Result<TimelineEvent, sqlx::Error> {
        let status = RequestStatus::from_name(&self.status)
            .ok_or_else(|| decode_error(format!("unknown timeline status {:?}", self.status)))?;
        let actor_role = match self.actor_role.as_deref() {
            Some(name) => Some(
                ActorRole::from_name(name)
                    .ok_or_else(|| decode_error(format!("unknown actor role {name:?}")))?,
            ),
            None => None,
        };
        Ok(TimelineEvent {
            request_id: RequestId::new(self.request_id),
            status,
            timestamp: self.occurred_at,
            actor_id: self.actor_id,
            actor_role,
            notes: self.notes,
        })
    }
}
