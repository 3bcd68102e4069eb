//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use mailer::Mailer;
use operations::{
    AssignmentResolver, ContentWorkflow, LeadHandoff, LeadStatusListener, Onboarding, Publisher,
};
use realtime::ChannelHub;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Realtime hub the services publish on.
    pub hub: Arc<ChannelHub>,
    pub resolver: Arc<AssignmentResolver>,
    pub handoff: Arc<LeadHandoff>,
    pub onboarding: Arc<Onboarding>,
    pub content: Arc<ContentWorkflow>,
    /// Forwarded-lead counts fed by the `telecaller_leads` change feed.
    pub lead_counts: Arc<LeadStatusListener>,
}

impl AppState {
    /// Wire the services over one database and hub.
    pub fn new(db: Database, hub: Arc<ChannelHub>, mailer: Arc<dyn Mailer>) -> Self {
        let pool = db.pool().clone();
        let publisher = Publisher::new(hub.clone(), pool.clone());

        let resolver = Arc::new(AssignmentResolver::new(
            pool.clone(),
            mailer,
            publisher.clone(),
        ));
        let handoff = Arc::new(LeadHandoff::new(pool.clone(), publisher.clone()));
        let onboarding = Arc::new(Onboarding::new(
            pool.clone(),
            publisher.clone(),
            resolver.clone(),
        ));
        let content = Arc::new(ContentWorkflow::new(pool, publisher));

        Self {
            db,
            hub,
            resolver,
            handoff,
            onboarding,
            content,
            lead_counts: Arc::new(LeadStatusListener::new()),
        }
    }
}
