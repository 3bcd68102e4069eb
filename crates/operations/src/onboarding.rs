//! Turning a closed lead into a client account.

use std::sync::Arc;

use database::models::NewClient;
use database::{assignment, client, lead, Client};
use realtime::channels::tables;
use realtime::ChangeEvent;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::assignment::{AssignmentResolver, ResolvedAssignment};
use crate::error::{OperationsError, Result};
use crate::publisher::Publisher;

/// Fields a business developer submits to open a client account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewClientAccount {
    /// The business-developer lead this account closes, if any.
    pub bd_lead_id: Option<i64>,
    pub company_name: String,
    pub email: String,
    pub package: String,
}

/// Client account creation.
pub struct Onboarding {
    pool: SqlitePool,
    publisher: Publisher,
    resolver: Arc<AssignmentResolver>,
}

impl Onboarding {
    pub fn new(pool: SqlitePool, publisher: Publisher, resolver: Arc<AssignmentResolver>) -> Self {
        Self {
            pool,
            publisher,
            resolver,
        }
    }

    /// Create the client row and announce it on the `clients` feed, where the
    /// insert listener picks it up for assignment.
    #[instrument(skip(self, account), fields(company = %account.company_name, package = %account.package))]
    pub async fn create_client_account(&self, account: &NewClientAccount) -> Result<Client> {
        validate(account)?;

        if assignment::count_package_brand_heads(&self.pool, &account.package).await? == 0 {
            return Err(OperationsError::UnknownPackage(account.package.clone()));
        }

        if let Some(bd_lead_id) = account.bd_lead_id {
            lead::get_bd_lead(&self.pool, bd_lead_id).await?;
        }

        // The unique source lead rejects a second account for the same lead,
        // including one racing this call.
        let created = client::create_client(
            &self.pool,
            &NewClient {
                company_name: account.company_name.trim().to_string(),
                email: account.email.trim().to_string(),
                package: account.package.clone(),
                source_lead_id: account.bd_lead_id,
            },
        )
        .await?;
        info!(client_id = created.id, "Client account created");

        self.publisher.change(ChangeEvent::insert(
            tables::CLIENTS,
            serde_json::to_value(&created).unwrap_or(Value::Null),
        ));

        Ok(created)
    }

    /// Run the assignment inline instead of waiting for the feed.
    pub async fn assign_now(&self, client_id: i64) -> Result<ResolvedAssignment> {
        self.resolver.handle_client_insert(client_id).await
    }
}

fn validate(account: &NewClientAccount) -> Result<()> {
    if account.company_name.trim().is_empty() {
        return Err(OperationsError::Validation(
            "company_name is required".to_string(),
        ));
    }
    let email = account.email.trim();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(OperationsError::Validation(format!(
            "invalid email: {}",
            account.email
        )));
    }
    if account.package.trim().is_empty() {
        return Err(OperationsError::Validation("package is required".to_string()));
    }
    Ok(())
}
