//! Log of broadcasts sent on named realtime channels.

use sqlx::SqlitePool;

use crate::models::BroadcastLogEntry;
use crate::timestamp_now;
use crate::Result;

/// Record a broadcast.
pub async fn record(pool: &SqlitePool, channel: &str, event: &str, payload: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO broadcast_log (channel, event, payload, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(channel)
    .bind(event)
    .bind(payload)
    .bind(timestamp_now())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Most recent broadcasts on a channel, newest first.
pub async fn recent(pool: &SqlitePool, channel: &str, limit: i64) -> Result<Vec<BroadcastLogEntry>> {
    let entries = sqlx::query_as::<_, BroadcastLogEntry>(
        r#"
        SELECT id, channel, event, payload, created_at
        FROM broadcast_log
        WHERE channel = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(channel)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
