//! Content production statuses and the post transition table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StatusParseError, TransitionError};

// ---------------------------------------------------------------------------
// PostStatus
// ---------------------------------------------------------------------------

/// Status of a single marketing post inside a content batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostStatus {
    /// Written, waiting for the designer.
    #[serde(rename = "pending")]
    Pending,
    /// Designer submitted, waiting for the digital marketer.
    #[serde(rename = "pending_review")]
    PendingReview,
    /// Sent back to the designer.
    #[serde(rename = "rework_requested")]
    ReworkRequested,
    /// Approved by the digital marketer, waiting for the client.
    #[serde(rename = "DM_APPROVED")]
    DmApproved,
    /// Approved by the client.
    #[serde(rename = "approved")]
    Approved,
}

impl PostStatus {
    pub fn all() -> &'static [PostStatus] {
        &[
            PostStatus::Pending,
            PostStatus::PendingReview,
            PostStatus::ReworkRequested,
            PostStatus::DmApproved,
            PostStatus::Approved,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::PendingReview => "pending_review",
            PostStatus::ReworkRequested => "rework_requested",
            PostStatus::DmApproved => "DM_APPROVED",
            PostStatus::Approved => "approved",
        }
    }

    /// Look up the status an action leads to, if the table allows it.
    pub fn next(self, action: PostAction) -> Option<PostStatus> {
        use PostAction::*;
        use PostStatus::*;

        match (self, action) {
            (Pending | ReworkRequested, DesignerSubmit) => Some(PendingReview),
            (PendingReview, DmApprove) => Some(DmApproved),
            (PendingReview, DmRequestRework) => Some(ReworkRequested),
            (DmApproved, ClientApprove) => Some(Approved),
            (DmApproved, ClientRequestRework) => Some(ReworkRequested),
            _ => None,
        }
    }

    /// Apply an action, rejecting pairs the table does not list.
    pub fn apply(self, action: PostAction) -> Result<PostStatus, TransitionError> {
        self.next(action)
            .ok_or(TransitionError { from: self, action })
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostStatus::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError::new("post", s))
    }
}

// ---------------------------------------------------------------------------
// PostAction
// ---------------------------------------------------------------------------

/// Something a role does to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostAction {
    DesignerSubmit,
    DmApprove,
    DmRequestRework,
    ClientApprove,
    ClientRequestRework,
}

impl PostAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PostAction::DesignerSubmit => "designer_submit",
            PostAction::DmApprove => "dm_approve",
            PostAction::DmRequestRework => "dm_request_rework",
            PostAction::ClientApprove => "client_approve",
            PostAction::ClientRequestRework => "client_request_rework",
        }
    }
}

impl fmt::Display for PostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BatchStatus
// ---------------------------------------------------------------------------

/// Aggregate status of a content batch (one uploaded PDF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "READY_FOR_CLIENT")]
    ReadyForClient,
    #[serde(rename = "approved")]
    Approved,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::InProgress => "in_progress",
            BatchStatus::ReadyForClient => "READY_FOR_CLIENT",
            BatchStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(BatchStatus::InProgress),
            "READY_FOR_CLIENT" => Ok(BatchStatus::ReadyForClient),
            "approved" => Ok(BatchStatus::Approved),
            other => Err(StatusParseError::new("batch", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = PostStatus::Pending
            .apply(PostAction::DesignerSubmit)
            .and_then(|s| s.apply(PostAction::DmApprove))
            .and_then(|s| s.apply(PostAction::ClientApprove))
            .unwrap();
        assert_eq!(status, PostStatus::Approved);
    }

    #[test]
    fn test_rework_loops_back_through_review() {
        let status = PostStatus::PendingReview
            .apply(PostAction::DmRequestRework)
            .unwrap();
        assert_eq!(status, PostStatus::ReworkRequested);
        assert_eq!(
            status.apply(PostAction::DesignerSubmit).unwrap(),
            PostStatus::PendingReview
        );

        let status = PostStatus::DmApproved
            .apply(PostAction::ClientRequestRework)
            .unwrap();
        assert_eq!(status, PostStatus::ReworkRequested);
    }

    #[test]
    fn test_client_cannot_approve_unreviewed_post() {
        let err = PostStatus::PendingReview
            .apply(PostAction::ClientApprove)
            .unwrap_err();
        assert_eq!(err.from, PostStatus::PendingReview);
        assert_eq!(err.action, PostAction::ClientApprove);
        assert_eq!(
            err.to_string(),
            "cannot client_approve a post in status pending_review"
        );
    }

    #[test]
    fn test_approved_is_terminal() {
        let actions = [
            PostAction::DesignerSubmit,
            PostAction::DmApprove,
            PostAction::DmRequestRework,
            PostAction::ClientApprove,
            PostAction::ClientRequestRework,
        ];
        for action in actions {
            assert!(PostStatus::Approved.next(action).is_none(), "{action}");
        }
    }

    #[test]
    fn test_table_has_exactly_six_edges() {
        let actions = [
            PostAction::DesignerSubmit,
            PostAction::DmApprove,
            PostAction::DmRequestRework,
            PostAction::ClientApprove,
            PostAction::ClientRequestRework,
        ];
        let edges = PostStatus::all()
            .iter()
            .flat_map(|s| actions.iter().filter_map(move |a| s.next(*a)))
            .count();
        assert_eq!(edges, 6);
    }

    #[test]
    fn test_wire_strings() {
        for status in PostStatus::all() {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), *status);
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("DM_approved".parse::<PostStatus>().is_err());
        assert_eq!(
            "READY_FOR_CLIENT".parse::<BatchStatus>().unwrap(),
            BatchStatus::ReadyForClient
        );
    }
}
