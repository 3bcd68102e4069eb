//! Content workflow routes (writer, designer, digital marketer, client).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::{DesignerSubmission, HelpTicket, MarketingPost};
use operations::{BatchView, PostUpdate};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Request to create a content batch from an uploaded PDF.
#[derive(Deserialize)]
pub struct CreateBatchRequest {
    pub client_id: i64,
    pub title: String,
    pub pdf_path: String,
    /// One post per caption.
    pub captions: Vec<String>,
}

/// Request to submit artwork for a post.
#[derive(Deserialize)]
pub struct SubmissionRequest {
    pub designer_id: i64,
    pub asset_url: String,
    pub note: Option<String>,
}

#[derive(Serialize)]
pub struct SubmissionResponse {
    pub submission: DesignerSubmission,
    pub post: MarketingPost,
}

/// Request to raise a help ticket.
#[derive(Deserialize)]
pub struct HelpTicketRequest {
    pub raised_by_id: i64,
    pub message: String,
}

pub async fn create_batch(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateBatchRequest>,
) -> Result<(StatusCode, Json<BatchView>)> {
    let view = state
        .content
        .create_batch(req.client_id, &req.title, &req.pdf_path, &req.captions)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> Result<Json<BatchView>> {
    Ok(Json(state.content.get_batch(batch_id).await?))
}

pub async fn submit_design(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(req): ApiJson<SubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    let (submission, post) = state
        .content
        .submit_design(post_id, req.designer_id, &req.asset_url, req.note.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse { submission, post })))
}

pub async fn dm_approve(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostUpdate>> {
    Ok(Json(state.content.dm_approve(post_id).await?))
}

pub async fn dm_request_rework(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostUpdate>> {
    Ok(Json(state.content.dm_request_rework(post_id).await?))
}

pub async fn client_approve(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostUpdate>> {
    Ok(Json(state.content.client_approve(post_id).await?))
}

pub async fn client_request_rework(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostUpdate>> {
    Ok(Json(state.content.client_request_rework(post_id).await?))
}

pub async fn raise_help_ticket(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(req): ApiJson<HelpTicketRequest>,
) -> Result<(StatusCode, Json<HelpTicket>)> {
    let ticket = state
        .content
        .raise_help_ticket(post_id, req.raised_by_id, &req.message)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn resolve_help_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> Result<Json<HelpTicket>> {
    Ok(Json(state.content.resolve_help_ticket(ticket_id).await?))
}
