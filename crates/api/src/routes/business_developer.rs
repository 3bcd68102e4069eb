//! Business developer routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::{BdLead, Client};
use operations::{NewClientAccount, ResolvedAssignment};
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::state::AppState;

/// A new client account and, if it went through, its brand head.
#[derive(Serialize)]
pub struct CreatedClient {
    pub client: Client,
    pub assignment: Option<ResolvedAssignment>,
}

/// Leads handed to a business developer.
pub async fn list_leads(
    State(state): State<AppState>,
    Path(bd_id): Path<i64>,
) -> Result<Json<Vec<BdLead>>> {
    let leads = state.handoff.leads_for_business_developer(bd_id).await?;
    Ok(Json(leads))
}

/// Open a client account and assign it straight away.
///
/// The account stands even if the inline assignment fails. The insert
/// listener sees the same client on the change feed.
pub async fn create_client(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewClientAccount>,
) -> Result<(StatusCode, Json<CreatedClient>)> {
    let client = state.onboarding.create_client_account(&req).await?;

    let assignment = match state.onboarding.assign_now(client.id).await {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            warn!(client_id = client.id, "Inline assignment failed: {}", e);
            None
        }
    };

    Ok((StatusCode::CREATED, Json(CreatedClient { client, assignment })))
}
