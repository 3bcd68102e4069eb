//! Error types for realtime operations.

use thiserror::Error;

/// Errors that can occur on realtime channels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// The transport is not open.
    #[error("realtime transport not connected")]
    NotConnected,

    /// The channel was closed underneath a subscriber (transport dropped).
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Unsubscribing from a channel the hub does not know.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// Transport-level failure while connecting.
    #[error("transport error: {0}")]
    Transport(String),

    /// A re-subscribe callback failed.
    #[error("resubscribe failed for {name}: {reason}")]
    Resubscribe { name: String, reason: String },
}
