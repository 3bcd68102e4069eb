//! The content production workflow.
//!
//! Posts move through the transition table in `workflow_core`. After every
//! review action the batch status is recomputed from all of its posts. The
//! post write, the sibling read and the batch write share one `BEGIN
//! IMMEDIATE` transaction, so concurrent reviews in the same batch are
//! serialized and the batch never reflects a stale set of siblings.

use database::{
    begin_immediate, client, content, staff, ContentBatch, DatabaseError, DesignerSubmission,
    HelpTicket, MarketingPost, StaffRole,
};
use realtime::channels::{self, tables};
use realtime::ChangeEvent;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};
use workflow_core::{
    recompute_parent_status, AggregateRule, BatchStatus, PostAction, PostStatus, CLIENT_APPROVED,
    CLIENT_READY, REWORK_REOPENS,
};

use crate::error::{OperationsError, Result};
use crate::publisher::Publisher;

/// A batch with its posts.
#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    pub batch: ContentBatch,
    pub posts: Vec<MarketingPost>,
}

/// Result of a post action.
#[derive(Debug, Clone, Serialize)]
pub struct PostUpdate {
    pub post: MarketingPost,
    /// Batch status after propagation.
    pub batch_status: BatchStatus,
    /// Whether this action changed the batch status.
    pub batch_changed: bool,
}

/// Batch status before and after a recompute.
struct BatchChange {
    batch: ContentBatch,
    from: BatchStatus,
    to: BatchStatus,
}

impl BatchChange {
    fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Content batch and post operations.
pub struct ContentWorkflow {
    pool: SqlitePool,
    publisher: Publisher,
}

impl ContentWorkflow {
    pub fn new(pool: SqlitePool, publisher: Publisher) -> Self {
        Self { pool, publisher }
    }

    /// Create a batch with one `pending` post per caption.
    #[instrument(skip(self, captions), fields(posts = captions.len()))]
    pub async fn create_batch(
        &self,
        client_id: i64,
        title: &str,
        pdf_path: &str,
        captions: &[String],
    ) -> Result<BatchView> {
        if title.trim().is_empty() {
            return Err(OperationsError::Validation("title is required".to_string()));
        }
        if captions.is_empty() {
            return Err(OperationsError::Validation(
                "a batch needs at least one post".to_string(),
            ));
        }
        client::get_client(&self.pool, client_id).await?;

        let (batch, posts) =
            content::create_batch(&self.pool, client_id, title.trim(), pdf_path, captions).await?;
        info!(batch_id = batch.id, client_id, "Content batch created");

        self.publisher
            .change(ChangeEvent::insert(tables::CONTENT_BATCHES, to_record(&batch)));
        Ok(BatchView { batch, posts })
    }

    /// Load a batch and its posts.
    pub async fn get_batch(&self, batch_id: i64) -> Result<BatchView> {
        let batch = content::get_batch(&self.pool, batch_id).await?;
        let posts = content::list_posts(&self.pool, batch_id).await?;
        Ok(BatchView { batch, posts })
    }

    /// Record a designer's artwork and send the post to review.
    pub async fn submit_design(
        &self,
        post_id: i64,
        designer_id: i64,
        asset_url: &str,
        note: Option<&str>,
    ) -> Result<(DesignerSubmission, MarketingPost)> {
        if asset_url.trim().is_empty() {
            return Err(OperationsError::Validation("asset_url is required".to_string()));
        }
        staff::get_with_role(&self.pool, designer_id, StaffRole::Designer).await?;

        let mut tx = begin_immediate(&self.pool).await?;
        let post = transition(&mut tx, post_id, PostAction::DesignerSubmit).await?;
        let submission =
            content::add_submission(&mut tx, post_id, designer_id, asset_url, note).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        self.publisher.change(ChangeEvent::insert(
            tables::DESIGNER_SUBMISSIONS,
            to_record(&submission),
        ));
        Ok((submission, post))
    }

    pub async fn dm_approve(&self, post_id: i64) -> Result<PostUpdate> {
        self.review(post_id, PostAction::DmApprove, &CLIENT_READY).await
    }

    pub async fn dm_request_rework(&self, post_id: i64) -> Result<PostUpdate> {
        self.review(post_id, PostAction::DmRequestRework, &REWORK_REOPENS)
            .await
    }

    pub async fn client_approve(&self, post_id: i64) -> Result<PostUpdate> {
        self.review(post_id, PostAction::ClientApprove, &CLIENT_APPROVED)
            .await
    }

    pub async fn client_request_rework(&self, post_id: i64) -> Result<PostUpdate> {
        self.review(post_id, PostAction::ClientRequestRework, &REWORK_REOPENS)
            .await
    }

    async fn review(
        &self,
        post_id: i64,
        action: PostAction,
        rule: &AggregateRule,
    ) -> Result<PostUpdate> {
        let mut tx = begin_immediate(&self.pool).await?;
        let post = transition(&mut tx, post_id, action).await?;
        let change = recompute(&mut tx, post.batch_id, rule).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        self.announce(&change).await;
        Ok(PostUpdate {
            post,
            batch_status: change.to,
            batch_changed: change.changed(),
        })
    }

    /// Recompute a batch's status from all of its posts.
    ///
    /// Writes only when the rule yields a status different from the stored
    /// one. Returns the new status if it changed.
    #[instrument(skip(self, rule), fields(rule = rule.name))]
    pub async fn propagate(
        &self,
        batch_id: i64,
        rule: &AggregateRule,
    ) -> Result<Option<BatchStatus>> {
        let mut tx = begin_immediate(&self.pool).await?;
        let change = recompute(&mut tx, batch_id, rule).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        self.announce(&change).await;
        Ok(change.changed().then_some(change.to))
    }

    /// Publish a committed batch status change.
    async fn announce(&self, change: &BatchChange) {
        if !change.changed() {
            return;
        }
        let batch = &change.batch;
        info!(batch_id = batch.id, from = %change.from, to = %change.to, "Batch status changed");

        self.publisher.change(ChangeEvent::update(
            tables::CONTENT_BATCHES,
            json!({
                "id": batch.id,
                "client_id": batch.client_id,
                "status": change.to.as_str(),
            }),
        ));

        if change.to == BatchStatus::ReadyForClient {
            self.publisher
                .broadcast(
                    &channels::private_notifications(batch.client_id),
                    "content-ready",
                    json!({ "batchId": batch.id, "title": batch.title }),
                )
                .await;
        }
    }

    /// Escalate a problem with a post.
    pub async fn raise_help_ticket(
        &self,
        post_id: i64,
        raised_by_id: i64,
        message: &str,
    ) -> Result<HelpTicket> {
        if message.trim().is_empty() {
            return Err(OperationsError::Validation("message is required".to_string()));
        }
        content::get_post(&self.pool, post_id).await?;
        staff::get_staff(&self.pool, raised_by_id).await?;

        let ticket =
            content::create_help_ticket(&self.pool, post_id, raised_by_id, message.trim()).await?;
        info!(ticket_id = ticket.id, post_id, "Help ticket raised");

        self.publisher
            .change(ChangeEvent::insert(tables::HELP_TICKETS, to_record(&ticket)));
        Ok(ticket)
    }

    /// Close a help ticket. Resolving an already-resolved ticket is a no-op.
    pub async fn resolve_help_ticket(&self, ticket_id: i64) -> Result<HelpTicket> {
        let changed = content::resolve_help_ticket(&self.pool, ticket_id).await?;
        let ticket = content::get_help_ticket(&self.pool, ticket_id).await?;

        if changed {
            info!(ticket_id, "Help ticket resolved");
            self.publisher
                .change(ChangeEvent::update(tables::HELP_TICKETS, to_record(&ticket)));
        }
        Ok(ticket)
    }
}

/// Apply one action to a post through the transition table.
async fn transition(
    conn: &mut SqliteConnection,
    post_id: i64,
    action: PostAction,
) -> Result<MarketingPost> {
    let mut post = content::get_post_on(conn, post_id).await?;
    let from: PostStatus = post.status.parse()?;
    let to = from.apply(action)?;

    // Holding the write lock, the row cannot have moved since the read.
    if !content::update_post_status(conn, post_id, from, to).await? {
        return Err(OperationsError::Validation(format!(
            "post {} changed during review",
            post_id
        )));
    }
    debug!(post_id, from = %from, to = %to, "Post status changed");
    post.status = to.as_str().to_string();
    Ok(post)
}

/// Read the siblings and store the status the rule derives from them.
async fn recompute(
    conn: &mut SqliteConnection,
    batch_id: i64,
    rule: &AggregateRule,
) -> Result<BatchChange> {
    let batch = content::get_batch_on(conn, batch_id).await?;
    let from: BatchStatus = batch.status.parse()?;
    let children = content::sibling_statuses(conn, batch_id).await?;

    let to = match recompute_parent_status(&children, rule) {
        Some(target) if target != from => {
            content::set_batch_status(conn, batch_id, target).await?;
            target
        }
        _ => {
            debug!(batch_id, rule = rule.name, "Batch status unchanged");
            from
        }
    };
    Ok(BatchChange { batch, from, to })
}

fn to_record<T: Serialize>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}
