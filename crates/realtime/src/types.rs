//! Message and transport types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RealtimeError;

/// Kind of row change on a table feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// The row after the change (the deleted row for deletes).
    pub record: Value,
}

impl ChangeEvent {
    pub fn insert(table: impl Into<String>, record: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Insert,
            record,
        }
    }

    pub fn update(table: impl Into<String>, record: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Update,
            record,
        }
    }

    /// Read an integer column from the record.
    pub fn id_field(&self, field: &str) -> Option<i64> {
        self.record.get(field).and_then(Value::as_i64)
    }
}

/// A message delivered to a channel subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeMessage {
    /// An ad hoc event on a named channel.
    Broadcast { event: String, payload: Value },
    /// A row change on a table feed.
    PostgresChanges(ChangeEvent),
}

/// State of the realtime socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Open,
    Connecting,
    Closed,
}

/// The socket the supervisor keeps alive.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Cached connection state.
    fn state(&self) -> ConnectionState;

    /// Drop the connection. Existing channel subscriptions die with it.
    async fn disconnect(&self) -> Result<(), RealtimeError>;

    /// Open the connection.
    async fn connect(&self) -> Result<(), RealtimeError>;
}
