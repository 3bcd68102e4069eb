//! Content batches, marketing posts, designer submissions and help tickets.

//!
//! Functions taking a `SqliteConnection` are meant to run inside a
//! transaction from [`crate::begin_immediate`], so a post change and the batch
//! status derived from it commit together.

use sqlx::{SqliteConnection, SqlitePool};
use workflow_core::{BatchStatus, PostStatus};

use crate::error::{DatabaseError, Result};
use crate::models::{ContentBatch, DesignerSubmission, HelpTicket, MarketingPost};
use crate::timestamp_now;

/// Create a batch in `in_progress` with one `pending` post per caption.
pub async fn create_batch(
    pool: &SqlitePool,
    client_id: i64,
    title: &str,
    pdf_path: &str,
    captions: &[String],
) -> Result<(ContentBatch, Vec<MarketingPost>)> {
    let mut tx = pool.begin().await?;
    let now = timestamp_now();

    let batch_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO content_batches (client_id, title, pdf_path, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(client_id)
    .bind(title)
    .bind(pdf_path)
    .bind(BatchStatus::InProgress.as_str())
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await?;

    let mut posts = Vec::with_capacity(captions.len());
    for caption in captions {
        let post_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO marketing_posts (batch_id, caption, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(batch_id)
        .bind(caption)
        .bind(PostStatus::Pending.as_str())
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        posts.push(MarketingPost {
            id: post_id,
            batch_id,
            caption: caption.clone(),
            status: PostStatus::Pending.as_str().to_string(),
            created_at: now.clone(),
            updated_at: now.clone(),
        });
    }

    tx.commit().await?;

    let batch = ContentBatch {
        id: batch_id,
        client_id,
        title: title.to_string(),
        pdf_path: pdf_path.to_string(),
        status: BatchStatus::InProgress.as_str().to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    Ok((batch, posts))
}

/// Get a batch by ID.
pub async fn get_batch(pool: &SqlitePool, id: i64) -> Result<ContentBatch> {
    let mut conn = pool.acquire().await?;
    get_batch_on(&mut conn, id).await
}

pub async fn get_batch_on(conn: &mut SqliteConnection, id: i64) -> Result<ContentBatch> {
    sqlx::query_as::<_, ContentBatch>(
        r#"
        SELECT id, client_id, title, pdf_path, status, created_at, updated_at
        FROM content_batches
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DatabaseError::not_found("ContentBatch", id))
}

/// Overwrite a batch's aggregate status.
pub async fn set_batch_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: BatchStatus,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE content_batches
        SET status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(timestamp_now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ContentBatch", id));
    }

    Ok(())
}

/// Get a post by ID.
pub async fn get_post(pool: &SqlitePool, id: i64) -> Result<MarketingPost> {
    let mut conn = pool.acquire().await?;
    get_post_on(&mut conn, id).await
}

pub async fn get_post_on(conn: &mut SqliteConnection, id: i64) -> Result<MarketingPost> {
    sqlx::query_as::<_, MarketingPost>(
        r#"
        SELECT id, batch_id, caption, status, created_at, updated_at
        FROM marketing_posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DatabaseError::not_found("MarketingPost", id))
}

/// List the posts of a batch in creation order.
pub async fn list_posts(pool: &SqlitePool, batch_id: i64) -> Result<Vec<MarketingPost>> {
    let posts = sqlx::query_as::<_, MarketingPost>(
        r#"
        SELECT id, batch_id, caption, status, created_at, updated_at
        FROM marketing_posts
        WHERE batch_id = ?
        ORDER BY id
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Current statuses of every post in a batch.
pub async fn sibling_statuses(
    conn: &mut SqliteConnection,
    batch_id: i64,
) -> Result<Vec<PostStatus>> {
    let raw = sqlx::query_scalar::<_, String>(
        r#"
        SELECT status FROM marketing_posts WHERE batch_id = ? ORDER BY id
        "#,
    )
    .bind(batch_id)
    .fetch_all(&mut *conn)
    .await?;

    raw.into_iter()
        .map(|s| {
            s.parse::<PostStatus>().map_err(|_| DatabaseError::InvalidValue {
                field: "marketing_posts.status",
                value: s,
            })
        })
        .collect()
}

/// Move a post from `from` to `to`.
///
/// The update is conditional on the post still being in `from`; if another
/// writer moved it first, nothing changes and `Ok(false)` is returned.
pub async fn update_post_status(
    conn: &mut SqliteConnection,
    id: i64,
    from: PostStatus,
    to: PostStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE marketing_posts
        SET status = ?, updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to.as_str())
    .bind(timestamp_now())
    .bind(id)
    .bind(from.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record a designer's submission for a post.
pub async fn add_submission(
    conn: &mut SqliteConnection,
    post_id: i64,
    designer_id: i64,
    asset_url: &str,
    note: Option<&str>,
) -> Result<DesignerSubmission> {
    let created_at = timestamp_now();
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO designer_submissions (post_id, designer_id, asset_url, note, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(designer_id)
    .bind(asset_url)
    .bind(note)
    .bind(&created_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(DesignerSubmission {
        id,
        post_id,
        designer_id,
        asset_url: asset_url.to_string(),
        note: note.map(str::to_string),
        created_at,
    })
}

/// Open a help ticket on a post.
pub async fn create_help_ticket(
    pool: &SqlitePool,
    post_id: i64,
    raised_by_id: i64,
    message: &str,
) -> Result<HelpTicket> {
    let created_at = timestamp_now();
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO help_tickets (post_id, raised_by_id, message, status, created_at)
        VALUES (?, ?, ?, 'open', ?)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(raised_by_id)
    .bind(message)
    .bind(&created_at)
    .fetch_one(pool)
    .await?;

    Ok(HelpTicket {
        id,
        post_id,
        raised_by_id,
        message: message.to_string(),
        status: "open".to_string(),
        created_at,
        resolved_at: None,
    })
}

/// Get a help ticket by ID.
pub async fn get_help_ticket(pool: &SqlitePool, id: i64) -> Result<HelpTicket> {
    sqlx::query_as::<_, HelpTicket>(
        r#"
        SELECT id, post_id, raised_by_id, message, status, created_at, resolved_at
        FROM help_tickets
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("HelpTicket", id))
}

/// Resolve an open help ticket. Returns `false` if it was already resolved.
pub async fn resolve_help_ticket(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE help_tickets
        SET status = 'resolved', resolved_at = ?
        WHERE id = ? AND status = 'open'
        "#,
    )
    .bind(timestamp_now())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish "already resolved" from "no such ticket".
        get_help_ticket(pool, id).await?;
        return Ok(false);
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::create_client;
    use crate::models::{NewClient, StaffRole};
    use crate::test_support::{add_staff, test_db};
    use crate::Database;

    async fn batch_of(db: &Database, n: usize) -> (ContentBatch, Vec<MarketingPost>) {
        let client = create_client(
            db.pool(),
            &NewClient {
                company_name: "Bakehouse".to_string(),
                email: "hello@bakehouse.test".to_string(),
                package: "SPARK".to_string(),
                source_lead_id: None,
            },
        )
        .await
        .unwrap();

        let captions: Vec<String> = (1..=n).map(|i| format!("Post {i}")).collect();
        create_batch(db.pool(), client.id, "June calendar", "uploads/june.pdf", &captions)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_batch_fans_out_posts() {
        let db = test_db().await;
        let (batch, posts) = batch_of(&db, 3).await;

        assert_eq!(batch.status, "in_progress");
        assert_eq!(posts.len(), 3);
        assert_eq!(list_posts(db.pool(), batch.id).await.unwrap(), posts);
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            sibling_statuses(&mut conn, batch.id).await.unwrap(),
            vec![PostStatus::Pending; 3]
        );
        assert_eq!(get_batch_on(&mut conn, batch.id).await.unwrap(), batch);
    }

    #[tokio::test]
    async fn test_conditional_post_update() {
        let db = test_db().await;
        let (_, posts) = batch_of(&db, 1).await;
        let id = posts[0].id;
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(update_post_status(&mut conn, id, PostStatus::Pending, PostStatus::PendingReview)
            .await
            .unwrap());
        // Stale `from` no longer matches.
        assert!(!update_post_status(&mut conn, id, PostStatus::Pending, PostStatus::PendingReview)
            .await
            .unwrap());
        assert_eq!(get_post_on(&mut conn, id).await.unwrap().status, "pending_review");
    }

    #[tokio::test]
    async fn test_batch_status() {
        let db = test_db().await;
        let (batch, _) = batch_of(&db, 1).await;
        let mut conn = db.pool().acquire().await.unwrap();

        set_batch_status(&mut conn, batch.id, BatchStatus::ReadyForClient)
            .await
            .unwrap();
        assert_eq!(
            get_batch_on(&mut conn, batch.id).await.unwrap().status,
            "READY_FOR_CLIENT"
        );
        assert!(set_batch_status(&mut conn, 999, BatchStatus::Approved).await.is_err());
    }

    #[tokio::test]
    async fn test_writes_roll_back_with_transaction() {
        let db = test_db().await;
        let (batch, posts) = batch_of(&db, 1).await;

        let mut tx = crate::begin_immediate(db.pool()).await.unwrap();
        update_post_status(&mut tx, posts[0].id, PostStatus::Pending, PostStatus::PendingReview)
            .await
            .unwrap();
        set_batch_status(&mut tx, batch.id, BatchStatus::ReadyForClient)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(get_post(db.pool(), posts[0].id).await.unwrap().status, "pending");
        assert_eq!(get_batch(db.pool(), batch.id).await.unwrap().status, "in_progress");
    }

    #[tokio::test]
    async fn test_submissions_and_tickets() {
        let db = test_db().await;
        let designer = add_staff(&db, "Dev", StaffRole::Designer).await;
        let (_, posts) = batch_of(&db, 1).await;
        let post_id = posts[0].id;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = add_submission(&mut conn, post_id, designer.id, "https://cdn.test/a.png", None)
            .await
            .unwrap();
        let second =
            add_submission(&mut conn, post_id, designer.id, "https://cdn.test/b.png", Some("v2"))
                .await
                .unwrap();
        assert!(second.id > first.id);
        assert_eq!(first.note, None);
        assert_eq!(second.note.as_deref(), Some("v2"));
        drop(conn);

        let ticket = create_help_ticket(db.pool(), post_id, designer.id, "Brand colours?")
            .await
            .unwrap();
        assert!(ticket.resolved_at.is_none());

        assert!(resolve_help_ticket(db.pool(), ticket.id).await.unwrap());
        assert!(!resolve_help_ticket(db.pool(), ticket.id).await.unwrap());
        assert!(get_help_ticket(db.pool(), ticket.id).await.unwrap().resolved_at.is_some());

        let missing = resolve_help_ticket(db.pool(), 999).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }
}
