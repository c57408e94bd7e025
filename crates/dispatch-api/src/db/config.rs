//! Configuration persistence (`app_config` key/value table).
//!
//! Administered outside this service; read once at startup.

use sqlx::PgPool;

/// Every stored key/value pair.
pub async fn load_all(pool: &PgPool) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>("SELECT key, value FROM app_config ORDER BY key")
        .fetch_all(pool)
        .await
}
