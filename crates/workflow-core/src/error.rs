//! Error types for status handling.

use thiserror::Error;

use crate::content::{PostAction, PostStatus};

/// A requested status change that the transition table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} a post in status {from}")]
pub struct TransitionError {
    /// Status the post was in.
    pub from: PostStatus,
    /// Action that was attempted.
    pub action: PostAction,
}

/// A stored status string that does not name a known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status: {value:?}")]
pub struct StatusParseError {
    /// Which status family was being parsed.
    pub kind: &'static str,
    /// The offending value.
    pub value: String,
}

impl StatusParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
