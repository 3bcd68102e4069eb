//! Telecaller leads and their handoff to business developers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use database::lead;
use database::models::NewLead;
use database::{BdLead, TelecallerLead};
use realtime::channels::{self, tables};
use realtime::{ChangeEvent, ChangeKind};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};
use workflow_core::LeadStatus;

use crate::error::{OperationsError, Result};
use crate::listener::ChangeHandler;
use crate::publisher::Publisher;

/// Lead lifecycle operations for telecallers.
pub struct LeadHandoff {
    pool: SqlitePool,
    publisher: Publisher,
}

impl LeadHandoff {
    pub fn new(pool: SqlitePool, publisher: Publisher) -> Self {
        Self { pool, publisher }
    }

    /// Add a lead to a telecaller's list.
    pub async fn create_lead(&self, new: &NewLead) -> Result<TelecallerLead> {
        if new.company_name.trim().is_empty() {
            return Err(OperationsError::Validation(
                "company_name is required".to_string(),
            ));
        }
        if new.phone.trim().is_empty() {
            return Err(OperationsError::Validation("phone is required".to_string()));
        }

        let created = lead::create_lead(&self.pool, new).await?;
        self.publisher
            .change(ChangeEvent::insert(tables::TELECALLER_LEADS, lead_record(&created)));
        Ok(created)
    }

    /// Hand a lead to the business developer mapped to the telecaller.
    ///
    /// The lead becomes `Forwarded` and a `Pending` row appears on the
    /// business developer's list. A telecaller without a mapping is an
    /// error rather than a silent no-op.
    #[instrument(skip(self))]
    pub async fn assign_lead(&self, lead_id: i64, telecaller_id: i64) -> Result<BdLead> {
        let current = lead::get_lead(&self.pool, lead_id).await?;
        let status: LeadStatus = current.status.parse()?;
        if status == LeadStatus::Forwarded {
            return Err(OperationsError::InvalidLeadState {
                lead_id,
                status: status.to_string(),
                reason: "already handed to a business developer",
            });
        }

        let Some(bd_id) = lead::get_bd_for_telecaller(&self.pool, telecaller_id).await? else {
            error!(lead_id, telecaller_id, "Telecaller has no business developer mapping");
            return Err(OperationsError::NoBusinessDeveloperMapping { telecaller_id });
        };

        let bd_lead = lead::forward_lead(&self.pool, lead_id, bd_id, telecaller_id).await?;
        info!(lead_id, bd_id, bd_lead_id = bd_lead.id, "Lead forwarded");

        let mut record = lead_record(&current);
        record["status"] = json!(LeadStatus::Forwarded.as_str());
        record["forwarded_by_id"] = json!(telecaller_id);
        self.publisher
            .change(ChangeEvent::update(tables::TELECALLER_LEADS, record));
        self.publisher.change(ChangeEvent::insert(
            tables::BD_LEADS,
            serde_json::to_value(&bd_lead).unwrap_or(Value::Null),
        ));

        let payload = json!({
            "bdLeadId": bd_lead.id,
            "leadId": lead_id,
            "companyName": current.company_name,
            "contactName": current.contact_name,
            "forwardedBy": telecaller_id,
            "businessDeveloperId": bd_id,
        });
        self.publisher
            .broadcast(channels::BD_CHANGES, "new-lead", payload.clone())
            .await;
        self.publisher
            .broadcast(&channels::private_notifications(bd_id), "new-lead", payload)
            .await;

        Ok(bd_lead)
    }

    /// Change a lead's status by hand.
    pub async fn update_lead_status(
        &self,
        lead_id: i64,
        target: LeadStatus,
    ) -> Result<TelecallerLead> {
        let current = lead::get_lead(&self.pool, lead_id).await?;
        let status: LeadStatus = current.status.parse()?;

        if !status.telecaller_can_set(target) {
            let reason = if status == LeadStatus::Forwarded {
                "forwarded leads cannot be changed"
            } else {
                "use the forward action to hand off a lead"
            };
            return Err(OperationsError::InvalidLeadState {
                lead_id,
                status: status.to_string(),
                reason,
            });
        }

        lead::set_lead_status(&self.pool, lead_id, target).await?;
        let updated = lead::get_lead(&self.pool, lead_id).await?;
        debug!(lead_id, from = %status, to = %target, "Lead status changed");

        self.publisher
            .change(ChangeEvent::update(tables::TELECALLER_LEADS, lead_record(&updated)));
        Ok(updated)
    }

    /// Leads handed to a business developer, newest first.
    pub async fn leads_for_business_developer(&self, bd_id: i64) -> Result<Vec<BdLead>> {
        Ok(lead::list_bd_leads(&self.pool, bd_id).await?)
    }
}

fn lead_record(lead: &TelecallerLead) -> Value {
    serde_json::to_value(lead).unwrap_or(Value::Null)
}

/// Counts forwarded leads per telecaller from the `telecaller_leads` feed.
#[derive(Debug, Default)]
pub struct LeadStatusListener {
    forwarded: Mutex<HashMap<i64, HashSet<i64>>>,
}

impl LeadStatusListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct leads this telecaller has forwarded.
    pub fn forwarded_count(&self, telecaller_id: i64) -> usize {
        self.forwarded
            .lock()
            .ok()
            .and_then(|map| map.get(&telecaller_id).map(HashSet::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl ChangeHandler for LeadStatusListener {
    async fn handle(&self, event: ChangeEvent) {
        if event.kind != ChangeKind::Update {
            return;
        }

        let forwarded = event
            .record
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|s| s == LeadStatus::Forwarded.as_str());
        if !forwarded {
            return;
        }

        let telecaller = event
            .id_field("forwarded_by_id")
            .or_else(|| event.id_field("assigned_to_id"));
        let (Some(telecaller_id), Some(lead_id)) = (telecaller, event.id_field("id")) else {
            return;
        };

        if let Ok(mut map) = self.forwarded.lock() {
            map.entry(telecaller_id).or_default().insert(lead_id);
        }
        debug!(telecaller_id, lead_id, "Forwarded lead counted");
    }
}
