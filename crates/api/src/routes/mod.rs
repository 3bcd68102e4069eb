//! Route handlers for the HTTP API.

pub mod brand_head;
pub mod business_developer;
pub mod content;
pub mod health;
pub mod telecaller;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Telecaller
        .route("/api/telecaller/leads", post(telecaller::create_lead))
        .route("/api/telecaller/leads/:id/status", patch(telecaller::update_status))
        .route("/api/telecaller/leads/:id/forward", post(telecaller::forward))
        .route("/api/telecaller/:id/leads", get(telecaller::list_leads))
        .route("/api/telecaller/:id/forwarded", get(telecaller::forwarded_count))
        // Business developer
        .route("/api/bd/:id/leads", get(business_developer::list_leads))
        .route("/api/bd/clients", post(business_developer::create_client))
        // Brand head
        .route("/api/brand-head/:id/clients", get(brand_head::list_clients))
        // Content workflow
        .route("/api/writer/batches", post(content::create_batch))
        .route("/api/content/batches/:id", get(content::get_batch))
        .route("/api/designer/posts/:id/submissions", post(content::submit_design))
        .route("/api/dm/posts/:id/approve", post(content::dm_approve))
        .route("/api/dm/posts/:id/rework", post(content::dm_request_rework))
        .route("/api/client/posts/:id/approve", post(content::client_approve))
        .route("/api/client/posts/:id/rework", post(content::client_request_rework))
        .route("/api/posts/:id/help-tickets", post(content::raise_help_ticket))
        .route("/api/help-tickets/:id/resolve", post(content::resolve_help_ticket))
}
