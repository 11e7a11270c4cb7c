//! Log Database Queries
//!
//! Uses runtime queries (`sqlx::query`) to avoid requiring a live database at
//! compile time.

use sqlx::PgPool;

/// Append a usage row.
pub async fn insert_usage_log(
    pool: &PgPool,
    user_id: &str,
    query: &str,
    event_ts: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO usage_logs (user_id, query, event_ts)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(user_id)
    .bind(query)
    .bind(event_ts)
    .execute(pool)
    .await?;

    Ok(())
}

/// Append an error row.
pub async fn insert_error_log(pool: &PgPool, message: &str) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO error_logs (message) VALUES ($1)")
        .bind(message)
        .execute(pool)
        .await?;

    Ok(())
}
