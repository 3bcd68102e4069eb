//! Deriving a batch status from the statuses of its posts.
//!
//! Every handler that changes a post goes through [`recompute_parent_status`]
//! with one of the named rules below, so the stage predicates live in one place.

use crate::content::{BatchStatus, PostStatus};

/// How many children must satisfy the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// Every child, and there must be at least one.
    All,
    /// At least one child.
    Any,
}

/// A stage predicate paired with the batch status it produces.
#[derive(Debug, Clone, Copy)]
pub struct AggregateRule {
    /// Rule name for logs.
    pub name: &'static str,
    pub quantifier: Quantifier,
    pub predicate: fn(PostStatus) -> bool,
    pub target: BatchStatus,
}

impl AggregateRule {
    fn holds(&self, children: &[PostStatus]) -> bool {
        match self.quantifier {
            Quantifier::All => {
                !children.is_empty() && children.iter().all(|s| (self.predicate)(*s))
            }
            Quantifier::Any => children.iter().any(|s| (self.predicate)(*s)),
        }
    }
}

/// Every post has passed digital-marketer review.
pub const CLIENT_READY: AggregateRule = AggregateRule {
    name: "client_ready",
    quantifier: Quantifier::All,
    predicate: |s| matches!(s, PostStatus::DmApproved | PostStatus::Approved),
    target: BatchStatus::ReadyForClient,
};

/// Every post has been approved by the client.
pub const CLIENT_APPROVED: AggregateRule = AggregateRule {
    name: "client_approved",
    quantifier: Quantifier::All,
    predicate: |s| s == PostStatus::Approved,
    target: BatchStatus::Approved,
};

/// Some post went back to the designer.
pub const REWORK_REOPENS: AggregateRule = AggregateRule {
    name: "rework_reopens",
    quantifier: Quantifier::Any,
    predicate: |s| {
        matches!(
            s,
            PostStatus::Pending | PostStatus::PendingReview | PostStatus::ReworkRequested
        )
    },
    target: BatchStatus::InProgress,
};

/// Return the rule's target status if `children` satisfy it, otherwise `None`
/// (the parent keeps whatever status it had).
pub fn recompute_parent_status(
    children: &[PostStatus],
    rule: &AggregateRule,
) -> Option<BatchStatus> {
    rule.holds(children).then_some(rule.target)
}
