//! In-process channel hub.
//!
//! The hub is the realtime transport the services run against: each named
//! channel is a `tokio::sync::broadcast` channel. Disconnecting drops every
//! sender, so existing subscriptions end and must be re-established after
//! the hub reopens.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::channels;
use crate::error::RealtimeError;
use crate::types::{ChangeEvent, ConnectionState, RealtimeMessage, RealtimeTransport};

const DEFAULT_CAPACITY: usize = 256;

/// Named broadcast channels behind a single connection state.
pub struct ChannelHub {
    channels: Mutex<HashMap<String, broadcast::Sender<RealtimeMessage>>>,
    state: Mutex<ConnectionState>,
    capacity: usize,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHub {
    /// Create an open hub.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an open hub with a per-channel buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            state: Mutex::new(ConnectionState::Open),
            capacity: capacity.max(1),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    fn current_state(&self) -> ConnectionState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ConnectionState::Closed)
    }

    /// Subscribe to a named channel.
    pub fn subscribe(&self, channel: &str) -> Result<Subscription, RealtimeError> {
        if self.current_state() != ConnectionState::Open {
            return Err(RealtimeError::NotConnected);
        }

        let mut map = self
            .channels
            .lock()
            .map_err(|_| RealtimeError::NotConnected)?;
        let sender = map
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);

        debug!("Subscribed to {}", channel);
        Ok(Subscription {
            channel: channel.to_string(),
            receiver: sender.subscribe(),
        })
    }

    /// Subscribe to the change feed of a table.
    pub fn subscribe_changes(&self, table: &str) -> Result<Subscription, RealtimeError> {
        self.subscribe(&channels::table_changes(table))
    }

    /// Drop a subscription and forget the channel once nobody listens.
    pub fn unsubscribe(&self, subscription: Subscription) -> Result<(), RealtimeError> {
        let Subscription { channel, receiver } = subscription;
        drop(receiver);

        let mut map = self
            .channels
            .lock()
            .map_err(|_| RealtimeError::NotConnected)?;
        match map.get(&channel) {
            Some(sender) if sender.receiver_count() == 0 => {
                map.remove(&channel);
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(RealtimeError::UnknownChannel(channel)),
        }
    }

    /// Deliver a message to a channel. Returns how many subscribers got it.
    pub fn send(&self, channel: &str, message: RealtimeMessage) -> Result<usize, RealtimeError> {
        if self.current_state() != ConnectionState::Open {
            return Err(RealtimeError::NotConnected);
        }

        let map = self
            .channels
            .lock()
            .map_err(|_| RealtimeError::NotConnected)?;
        // No sender means nobody ever subscribed.
        let delivered = match map.get(channel) {
            Some(sender) => sender.send(message).unwrap_or(0),
            None => 0,
        };
        Ok(delivered)
    }

    /// Send a broadcast event on a named channel.
    pub fn broadcast(
        &self,
        channel: &str,
        event: &str,
        payload: Value,
    ) -> Result<usize, RealtimeError> {
        self.send(
            channel,
            RealtimeMessage::Broadcast {
                event: event.to_string(),
                payload,
            },
        )
    }

    /// Publish a row change on the table's feed.
    pub fn publish_change(&self, event: ChangeEvent) -> Result<usize, RealtimeError> {
        let channel = channels::table_changes(&event.table);
        self.send(&channel, RealtimeMessage::PostgresChanges(event))
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .ok()
            .and_then(|map| map.get(channel).map(|s| s.receiver_count()))
            .unwrap_or(0)
    }

    /// Drop the connection and every channel on it.
    pub fn close(&self) {
        self.set_state(ConnectionState::Closed);
        if let Ok(mut map) = self.channels.lock() {
            let count = map.len();
            map.clear();
            info!("Realtime hub closed ({} channels dropped)", count);
        }
    }

    /// Reopen the connection. Channels start empty.
    pub fn open(&self) {
        self.set_state(ConnectionState::Open);
        info!("Realtime hub open");
    }
}

#[async_trait]
impl RealtimeTransport for ChannelHub {
    fn state(&self) -> ConnectionState {
        self.current_state()
    }

    async fn disconnect(&self) -> Result<(), RealtimeError> {
        self.close();
        Ok(())
    }

    async fn connect(&self) -> Result<(), RealtimeError> {
        self.set_state(ConnectionState::Connecting);
        self.open();
        Ok(())
    }
}

/// A live subscription to one channel.
pub struct Subscription {
    channel: String,
    receiver: broadcast::Receiver<RealtimeMessage>,
}

impl Subscription {
    /// The channel name.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next message.
    ///
    /// Returns `ChannelClosed` once the transport drops. Lagged messages are
    /// skipped with a warning.
    pub async fn recv(&mut self) -> Result<RealtimeMessage, RealtimeError> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Ok(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber on {} lagged, skipped {}", self.channel, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(RealtimeError::ChannelClosed(self.channel.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let hub = ChannelHub::new();
        let mut sub = hub.subscribe("private-notifications-3").unwrap();

        let delivered = hub
            .broadcast("private-notifications-3", "new-client", json!({"clientId": 9}))
            .unwrap();
        assert_eq!(delivered, 1);

        match sub.recv().await.unwrap() {
            RealtimeMessage::Broadcast { event, payload } => {
                assert_eq!(event, "new-client");
                assert_eq!(payload["clientId"], 9);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_without_subscribers() {
        let hub = ChannelHub::new();
        assert_eq!(hub.broadcast("nobody", "ping", json!({})).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_change_feed() {
        let hub = ChannelHub::new();
        let mut sub = hub.subscribe_changes("clients").unwrap();

        hub.publish_change(ChangeEvent::insert("clients", json!({"id": 1})))
            .unwrap();

        match sub.recv().await.unwrap() {
            RealtimeMessage::PostgresChanges(event) => {
                assert_eq!(event.kind, ChangeKind::Insert);
                assert_eq!(event.id_field("id"), Some(1));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let hub = ChannelHub::new();
        let mut sub = hub.subscribe("projections").unwrap();

        hub.close();

        assert_eq!(
            sub.recv().await,
            Err(RealtimeError::ChannelClosed("projections".to_string()))
        );
        assert_eq!(hub.subscribe("projections").err(), Some(RealtimeError::NotConnected));
        assert_eq!(
            hub.broadcast("projections", "x", json!({})).err(),
            Some(RealtimeError::NotConnected)
        );

        hub.open();
        assert!(hub.subscribe("projections").is_ok());
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = ChannelHub::new();
        let a = hub.subscribe("c").unwrap();
        let b = hub.subscribe("c").unwrap();
        assert_eq!(hub.subscriber_count("c"), 2);

        hub.unsubscribe(a).unwrap();
        assert_eq!(hub.subscriber_count("c"), 1);
        hub.unsubscribe(b).unwrap();
        assert_eq!(hub.subscriber_count("c"), 0);

        // Channel already dropped by a reconnect
        let c = hub.subscribe("c").unwrap();
        hub.close();
        hub.open();
        assert_eq!(
            hub.unsubscribe(c),
            Err(RealtimeError::UnknownChannel("c".to_string()))
        );
    }
}
