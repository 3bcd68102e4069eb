//! Core status machines and assignment rules for the agency platform.
//!
//! This crate holds the pure decision logic shared by the persistence and
//! service layers. Nothing here performs I/O:
//!
//! - [`resolve_least_loaded`] - Picks the least-loaded candidate, tie-broken by recency
//! - [`PostStatus`] / [`PostAction`] - The per-post content status machine
//! - [`BatchStatus`] / [`AggregateRule`] - Parent batch status derived from its posts
//! - [`LeadStatus`] / [`BdLeadStatus`] - Lead lifecycle statuses
//!
//! # Example
//!
//! ```rust
//! use workflow_core::{recompute_parent_status, BatchStatus, PostAction, PostStatus, CLIENT_READY};
//!
//! let post = PostStatus::PendingReview.apply(PostAction::DmApprove).unwrap();
//! assert_eq!(post, PostStatus::DmApproved);
//!
//! let siblings = [PostStatus::DmApproved, post];
//! assert_eq!(
//!     recompute_parent_status(&siblings, &CLIENT_READY),
//!     Some(BatchStatus::ReadyForClient)
//! );
//! ```

mod aggregate;
mod assign;
mod content;
mod error;
mod lead;

pub use aggregate::{
    recompute_parent_status, AggregateRule, Quantifier, CLIENT_APPROVED, CLIENT_READY,
    REWORK_REOPENS,
};
pub use assign::resolve_least_loaded;
pub use content::{BatchStatus, PostAction, PostStatus};
pub use error::{StatusParseError, TransitionError};
pub use lead::{BdLeadStatus, LeadStatus};
