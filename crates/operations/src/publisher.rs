//! Best-effort realtime publishing.
//!
//! Realtime delivery is advisory: a closed transport or a failed log write is
//! logged and never fails the operation that triggered it.

use std::sync::Arc;

use database::broadcast_log;
use realtime::{ChangeEvent, ChannelHub};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Publishes change events and named broadcasts, logging broadcasts to the
/// `broadcast_log` table.
#[derive(Clone)]
pub struct Publisher {
    hub: Arc<ChannelHub>,
    pool: SqlitePool,
}

impl Publisher {
    pub fn new(hub: Arc<ChannelHub>, pool: SqlitePool) -> Self {
        Self { hub, pool }
    }

    /// The hub this publisher sends on.
    pub fn hub(&self) -> &Arc<ChannelHub> {
        &self.hub
    }

    /// Publish a row change.
    pub fn change(&self, event: ChangeEvent) {
        let table = event.table.clone();
        match self.hub.publish_change(event) {
            Ok(delivered) => debug!("Change on {} delivered to {}", table, delivered),
            Err(e) => warn!("Failed to publish change on {}: {}", table, e),
        }
    }

    /// Send a broadcast and record it.
    pub async fn broadcast(&self, channel: &str, event: &str, payload: Value) {
        match self.hub.broadcast(channel, event, payload.clone()) {
            Ok(delivered) => debug!("{} on {} delivered to {}", event, channel, delivered),
            Err(e) => warn!("Failed to broadcast {} on {}: {}", event, channel, e),
        }

        if let Err(e) = broadcast_log::record(&self.pool, channel, event, &payload.to_string()).await
        {
            warn!("Failed to log broadcast {} on {}: {}", event, channel, e);
        }
    }
}
