//! Telecaller leads, business-developer handoff rows, and the fixed routing table.

use sqlx::{SqliteConnection, SqlitePool};
use workflow_core::{BdLeadStatus, LeadStatus};

use crate::error::{DatabaseError, Result};
use crate::models::{BdLead, NewLead, TelecallerLead};
use crate::timestamp_now;

const LEAD_COLUMNS: &str = "id, company_name, contact_name, phone, email, status, assigned_to_id, created_at, updated_at";
const BD_LEAD_COLUMNS: &str =
    "id, lead_id, business_developer_id, forwarded_by_id, status, created_at, updated_at";

/// Create a new lead in status `New`.
pub async fn create_lead(pool: &SqlitePool, lead: &NewLead) -> Result<TelecallerLead> {
    let now = timestamp_now();
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO telecaller_leads
            (company_name, contact_name, phone, email, status, assigned_to_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&lead.company_name)
    .bind(&lead.contact_name)
    .bind(&lead.phone)
    .bind(&lead.email)
    .bind(LeadStatus::New.as_str())
    .bind(lead.assigned_to_id)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    get_lead(pool, id).await
}

/// Get a lead by ID.
pub async fn get_lead(pool: &SqlitePool, id: i64) -> Result<TelecallerLead> {
    sqlx::query_as::<_, TelecallerLead>(&format!(
        "SELECT {} FROM telecaller_leads WHERE id = ?",
        LEAD_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Lead", id))
}

/// List leads assigned to a telecaller, newest first.
pub async fn list_leads_for_telecaller(
    pool: &SqlitePool,
    telecaller_id: i64,
) -> Result<Vec<TelecallerLead>> {
    let leads = sqlx::query_as::<_, TelecallerLead>(&format!(
        "SELECT {} FROM telecaller_leads WHERE assigned_to_id = ? ORDER BY id DESC",
        LEAD_COLUMNS
    ))
    .bind(telecaller_id)
    .fetch_all(pool)
    .await?;

    Ok(leads)
}

/// Set a lead's status.
pub async fn set_lead_status(pool: &SqlitePool, id: i64, status: LeadStatus) -> Result<()> {
    let mut conn = pool.acquire().await?;
    set_lead_status_on(&mut conn, id, status).await
}

async fn set_lead_status_on(
    conn: &mut SqliteConnection,
    id: i64,
    status: LeadStatus,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE telecaller_leads
        SET status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(timestamp_now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Lead", id));
    }

    Ok(())
}

/// Route a telecaller's leads to a business developer, replacing any previous route.
pub async fn set_bd_mapping(
    pool: &SqlitePool,
    telecaller_id: i64,
    business_developer_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bd_tele_assignments (telecaller_id, business_developer_id)
        VALUES (?, ?)
        ON CONFLICT(telecaller_id) DO UPDATE SET
            business_developer_id = excluded.business_developer_id
        "#,
    )
    .bind(telecaller_id)
    .bind(business_developer_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up the business developer a telecaller forwards to.
pub async fn get_bd_for_telecaller(pool: &SqlitePool, telecaller_id: i64) -> Result<Option<i64>> {
    let bd = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT business_developer_id
        FROM bd_tele_assignments
        WHERE telecaller_id = ?
        "#,
    )
    .bind(telecaller_id)
    .fetch_optional(pool)
    .await?;

    Ok(bd)
}

/// Mark a lead `Forwarded` and create the business-developer row, atomically.
pub async fn forward_lead(
    pool: &SqlitePool,
    lead_id: i64,
    business_developer_id: i64,
    forwarded_by_id: i64,
) -> Result<BdLead> {
    let mut tx = pool.begin().await?;

    set_lead_status_on(&mut tx, lead_id, LeadStatus::Forwarded).await?;

    let now = timestamp_now();
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO bd_leads
            (lead_id, business_developer_id, forwarded_by_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(lead_id)
    .bind(business_developer_id)
    .bind(forwarded_by_id)
    .bind(BdLeadStatus::Pending.as_str())
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await
    .map_err(DatabaseError::on_unique("BdLead for lead", lead_id))?;

    tx.commit().await?;

    Ok(BdLead {
        id,
        lead_id,
        business_developer_id,
        forwarded_by_id,
        status: BdLeadStatus::Pending.as_str().to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a business-developer lead by ID.
pub async fn get_bd_lead(pool: &SqlitePool, id: i64) -> Result<BdLead> {
    sqlx::query_as::<_, BdLead>(&format!(
        "SELECT {} FROM bd_leads WHERE id = ?",
        BD_LEAD_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("BdLead", id))
}

/// List leads handed to a business developer, newest first.
pub async fn list_bd_leads(pool: &SqlitePool, business_developer_id: i64) -> Result<Vec<BdLead>> {
    let leads = sqlx::query_as::<_, BdLead>(&format!(
        "SELECT {} FROM bd_leads WHERE business_developer_id = ? ORDER BY id DESC",
        BD_LEAD_COLUMNS
    ))
    .bind(business_developer_id)
    .fetch_all(pool)
    .await?;

    Ok(leads)
}

/// Set a business-developer lead's status on an open connection or transaction.
pub async fn set_bd_lead_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: BdLeadStatus,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE bd_leads
        SET status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(timestamp_now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("BdLead", id));
    }

    Ok(())
}
