//! Telecaller routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::models::NewLead;
use database::{lead, BdLead, TelecallerLead};
use serde::{Deserialize, Serialize};
use workflow_core::LeadStatus;

use crate::error::{ApiError, Result};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Request to change a lead's status.
#[derive(Deserialize)]
pub struct StatusRequest {
    /// Display string, e.g. "Call Back".
    pub status: String,
}

/// Request to hand a lead to the telecaller's business developer.
#[derive(Deserialize)]
pub struct ForwardRequest {
    pub telecaller_id: i64,
}

#[derive(Serialize)]
pub struct ForwardedCount {
    pub telecaller_id: i64,
    pub forwarded: usize,
}

/// Add a lead.
pub async fn create_lead(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewLead>,
) -> Result<(StatusCode, Json<TelecallerLead>)> {
    let created = state.handoff.create_lead(&req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Change a lead's status by hand.
pub async fn update_status(
    State(state): State<AppState>,
    Path(lead_id): Path<i64>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<TelecallerLead>> {
    let status: LeadStatus = req
        .status
        .parse()
        .map_err(|e: workflow_core::StatusParseError| ApiError::Validation(e.to_string()))?;

    let updated = state.handoff.update_lead_status(lead_id, status).await?;
    Ok(Json(updated))
}

/// Forward a lead to the mapped business developer.
pub async fn forward(
    State(state): State<AppState>,
    Path(lead_id): Path<i64>,
    ApiJson(req): ApiJson<ForwardRequest>,
) -> Result<(StatusCode, Json<BdLead>)> {
    let bd_lead = state.handoff.assign_lead(lead_id, req.telecaller_id).await?;
    Ok((StatusCode::CREATED, Json(bd_lead)))
}

/// Leads on a telecaller's list.
pub async fn list_leads(
    State(state): State<AppState>,
    Path(telecaller_id): Path<i64>,
) -> Result<Json<Vec<TelecallerLead>>> {
    let leads = lead::list_leads_for_telecaller(state.db.pool(), telecaller_id).await?;
    Ok(Json(leads))
}

/// Forwarded-lead count observed on the change feed.
pub async fn forwarded_count(
    State(state): State<AppState>,
    Path(telecaller_id): Path<i64>,
) -> Json<ForwardedCount> {
    Json(ForwardedCount {
        telecaller_id,
        forwarded: state.lead_counts.forwarded_count(telecaller_id),
    })
}
