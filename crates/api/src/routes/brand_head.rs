//! Brand head routes.

use axum::extract::{Path, State};
use axum::Json;
use database::{client, staff, Client, StaffRole};

use crate::error::Result;
use crate::state::AppState;

/// Clients assigned to a brand head, most recent first.
pub async fn list_clients(
    State(state): State<AppState>,
    Path(brand_head_id): Path<i64>,
) -> Result<Json<Vec<Client>>> {
    let pool = state.db.pool();
    staff::get_with_role(pool, brand_head_id, StaffRole::BrandHead).await?;
    let clients = client::list_clients_for_brand_head(pool, brand_head_id).await?;
    Ok(Json(clients))
}
