//! Lead statuses for telecallers and business developers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StatusParseError;

/// Status of a raw lead on a telecaller's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    #[serde(rename = "New")]
    New,
    /// Handed to a business developer. Only the handoff sets this.
    #[serde(rename = "Forwarded")]
    Forwarded,
    #[serde(rename = "Not Interested")]
    NotInterested,
    #[serde(rename = "Call Back")]
    CallBack,
    #[serde(rename = "Not Reachable")]
    NotReachable,
}

impl LeadStatus {
    pub fn all() -> &'static [LeadStatus] {
        &[
            LeadStatus::New,
            LeadStatus::Forwarded,
            LeadStatus::NotInterested,
            LeadStatus::CallBack,
            LeadStatus::NotReachable,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Forwarded => "Forwarded",
            LeadStatus::NotInterested => "Not Interested",
            LeadStatus::CallBack => "Call Back",
            LeadStatus::NotReachable => "Not Reachable",
        }
    }

    /// Whether a telecaller may set `target` by hand on a lead in `self`.
    ///
    /// Forwarded leads belong to the business developer and are frozen.
    pub fn telecaller_can_set(self, target: LeadStatus) -> bool {
        self != LeadStatus::Forwarded && target != LeadStatus::Forwarded
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError::new("lead", s))
    }
}

/// Status of a handed-off lead on a business developer's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BdLeadStatus {
    Pending,
    /// A client account was created from this lead.
    Completed,
}

impl BdLeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BdLeadStatus::Pending => "Pending",
            BdLeadStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for BdLeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BdLeadStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(BdLeadStatus::Pending),
            "Completed" => Ok(BdLeadStatus::Completed),
            other => Err(StatusParseError::new("business developer lead", other)),
        }
    }
}
