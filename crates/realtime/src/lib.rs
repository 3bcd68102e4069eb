//! Realtime channels and connection supervision.
//!
//! This crate provides the in-process realtime layer used by the service
//! crates. It supports:
//!
//! - Table change feeds (insert/update/delete events per table)
//! - Named broadcast channels (per-user notifications, the BD channel, projections)
//! - A [`ConnectionSupervisor`] that detects a dropped transport, checks
//!   reachability, reconnects, and replays registered re-subscriptions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use realtime::{channels, ChannelHub, ConnectionSupervisor, DnsReachability, ReconnectConfig};
//!
//! # async fn example() -> Result<(), realtime::RealtimeError> {
//! let hub = Arc::new(ChannelHub::new());
//! let supervisor = ConnectionSupervisor::new(
//!     hub.clone(),
//!     Arc::new(DnsReachability::new("supabase.co")),
//!     ReconnectConfig::default(),
//! );
//!
//! let mut notifications = hub.subscribe(&channels::private_notifications(7))?;
//! let _watchdog = supervisor.spawn_watchdog(std::time::Duration::from_secs(30));
//!
//! while let Ok(message) = notifications.recv().await {
//!     println!("{:?}", message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channels;
mod error;
mod hub;
mod reachability;
mod supervisor;
mod types;

pub use error::RealtimeError;
pub use hub::{ChannelHub, Subscription};
pub use reachability::{DnsReachability, Reachability};
pub use supervisor::{
    ConnectionSupervisor, ReconnectConfig, ReconnectOutcome, ResubscribeFn, ResubscribeFuture,
};
pub use types::{ChangeEvent, ChangeKind, ConnectionState, RealtimeMessage, RealtimeTransport};

// Re-export async_trait for transport implementors
pub use async_trait::async_trait;
