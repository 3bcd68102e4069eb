//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::DatabaseError;

/// Role a staff member plays in the agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Telecaller,
    BusinessDeveloper,
    BrandHead,
    Writer,
    Designer,
    DigitalMarketer,
    Cmo,
}

impl StaffRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StaffRole::Telecaller => "telecaller",
            StaffRole::BusinessDeveloper => "business_developer",
            StaffRole::BrandHead => "brand_head",
            StaffRole::Writer => "writer",
            StaffRole::Designer => "designer",
            StaffRole::DigitalMarketer => "digital_marketer",
            StaffRole::Cmo => "cmo",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telecaller" => Ok(StaffRole::Telecaller),
            "business_developer" => Ok(StaffRole::BusinessDeveloper),
            "brand_head" => Ok(StaffRole::BrandHead),
            "writer" => Ok(StaffRole::Writer),
            "designer" => Ok(StaffRole::Designer),
            "digital_marketer" => Ok(StaffRole::DigitalMarketer),
            "cmo" => Ok(StaffRole::Cmo),
            other => Err(DatabaseError::InvalidValue {
                field: "staff.role",
                value: other.to_string(),
            }),
        }
    }
}

/// A staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// One of the [`StaffRole`] strings.
    pub role: String,
    pub created_at: String,
}

impl Staff {
    pub fn role(&self) -> Result<StaffRole, DatabaseError> {
        self.role.parse()
    }
}

/// Fields for a new staff member.
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub name: String,
    pub email: String,
    pub role: StaffRole,
}

impl NewStaff {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: StaffRole) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role,
        }
    }
}

/// A raw lead on a telecaller's list (TelecommunicatorLeads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TelecallerLead {
    pub id: i64,
    pub company_name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: Option<String>,
    /// One of the `LeadStatus` strings (e.g. "New", "Not Interested").
    pub status: String,
    /// Telecaller working the lead.
    pub assigned_to_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a new lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLead {
    pub company_name: String,
    pub contact_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub assigned_to_id: Option<i64>,
}

/// A lead handed from a telecaller to a business developer (BussinessDeveloper row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BdLead {
    pub id: i64,
    /// The originating telecaller lead.
    pub lead_id: i64,
    pub business_developer_id: i64,
    pub forwarded_by_id: i64,
    /// "Pending" or "Completed".
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A client company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub company_name: String,
    pub email: String,
    /// Package tier name (e.g. "SPARK").
    pub package: String,
    /// Set once a production team is formed.
    pub team_id: Option<i64>,
    /// Business-developer lead this account was created from.
    pub source_lead_id: Option<i64>,
    pub created_at: String,
}

/// Fields for a new client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub company_name: String,
    pub email: String,
    pub package: String,
    pub source_lead_id: Option<i64>,
}

/// A historical brand-head assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClientAssignment {
    pub id: i64,
    pub client_id: i64,
    pub brand_head_id: i64,
    pub assigned_at: String,
}

/// A brand head eligible for a package, with their current load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BrandHeadLoad {
    pub brand_head_id: i64,
    pub name: String,
    pub email: String,
    /// Every assignment this brand head has ever received, across all packages.
    pub assignment_count: i64,
    /// Timestamp of the most recent assignment, if any.
    pub last_assigned_at: Option<String>,
}

/// A content batch: one uploaded PDF fanned out into posts (Content row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContentBatch {
    pub id: i64,
    pub client_id: i64,
    pub title: String,
    pub pdf_path: String,
    /// One of the `BatchStatus` strings.
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A single post inside a batch (MarketingContent row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MarketingPost {
    pub id: i64,
    pub batch_id: i64,
    pub caption: String,
    /// One of the `PostStatus` strings.
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A designer's uploaded artwork for a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DesignerSubmission {
    pub id: i64,
    pub post_id: i64,
    pub designer_id: i64,
    pub asset_url: String,
    pub note: Option<String>,
    pub created_at: String,
}

/// An escalation raised against a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HelpTicket {
    pub id: i64,
    pub post_id: i64,
    pub raised_by_id: i64,
    pub message: String,
    /// "open" or "resolved".
    pub status: String,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

/// A broadcast that was sent on a named realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BroadcastLogEntry {
    pub id: i64,
    pub channel: String,
    pub event: String,
    /// JSON payload as sent.
    pub payload: String,
    pub created_at: String,
}
