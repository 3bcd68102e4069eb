//! Brand-head package pools and client assignment history.
//!
//! The assignment sequence (read loads, pick, insert, complete the lead) runs
//! under `BEGIN IMMEDIATE`, so two clients arriving at once cannot both read
//! the same minimum load.

use sqlx::{SqliteConnection, SqlitePool};
use workflow_core::BdLeadStatus;

use crate::error::{DatabaseError, Result};
use crate::lead::set_bd_lead_status;
use crate::models::{BrandHeadLoad, Client, ClientAssignment};
use crate::{begin_immediate, timestamp_now};

/// Result of [`assign_client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// A new assignment was written.
    Assigned {
        assignment: ClientAssignment,
        brand_head: BrandHeadLoad,
        /// The business-developer lead that was marked `Completed`, if the
        /// client came from one.
        completed_lead_id: Option<i64>,
    },
    /// The client already had an assignment; nothing was written.
    AlreadyAssigned(ClientAssignment),
    /// No brand head serves the client's package.
    NoCandidates { package: String },
}

/// Add a brand head to a package pool. Adding an existing pair is a no-op.
pub async fn add_package(pool: &SqlitePool, brand_head_id: i64, package: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO brand_head_packages (brand_head_id, package)
        VALUES (?, ?)
        ON CONFLICT(brand_head_id, package) DO NOTHING
        "#,
    )
    .bind(brand_head_id)
    .bind(package)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count brand heads serving a package.
pub async fn count_package_brand_heads(pool: &SqlitePool, package: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM brand_head_packages WHERE package = ?
        "#,
    )
    .bind(package)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Brand heads serving a package with their pool-wide load.
pub async fn package_loads(pool: &SqlitePool, package: &str) -> Result<Vec<BrandHeadLoad>> {
    let mut conn = pool.acquire().await?;
    package_loads_on(&mut conn, package).await
}

async fn package_loads_on(conn: &mut SqliteConnection, package: &str) -> Result<Vec<BrandHeadLoad>> {
    let loads = sqlx::query_as::<_, BrandHeadLoad>(
        r#"
        SELECT s.id AS brand_head_id,
               s.name AS name,
               s.email AS email,
               COUNT(ca.id) AS assignment_count,
               MAX(ca.assigned_at) AS last_assigned_at
        FROM brand_head_packages bp
        INNER JOIN staff s ON s.id = bp.brand_head_id
        LEFT JOIN client_assignments ca ON ca.brand_head_id = s.id
        WHERE bp.package = ?
        GROUP BY s.id, s.name, s.email
        ORDER BY s.id
        "#,
    )
    .bind(package)
    .fetch_all(&mut *conn)
    .await?;

    Ok(loads)
}

/// Get the assignment for a client, if one exists.
pub async fn get_assignment(pool: &SqlitePool, client_id: i64) -> Result<Option<ClientAssignment>> {
    let mut conn = pool.acquire().await?;
    get_assignment_on(&mut conn, client_id).await
}

async fn get_assignment_on(
    conn: &mut SqliteConnection,
    client_id: i64,
) -> Result<Option<ClientAssignment>> {
    let assignment = sqlx::query_as::<_, ClientAssignment>(
        r#"
        SELECT id, client_id, brand_head_id, assigned_at
        FROM client_assignments
        WHERE client_id = ?
        "#,
    )
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(assignment)
}

/// Write an assignment row directly with an explicit timestamp.
///
/// Used to import history; live assignments go through [`assign_client`].
pub async fn record_assignment(
    pool: &SqlitePool,
    client_id: i64,
    brand_head_id: i64,
    assigned_at: &str,
) -> Result<ClientAssignment> {
    let mut conn = pool.acquire().await?;
    insert_assignment(&mut conn, client_id, brand_head_id, assigned_at).await
}

async fn insert_assignment(
    conn: &mut SqliteConnection,
    client_id: i64,
    brand_head_id: i64,
    assigned_at: &str,
) -> Result<ClientAssignment> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO client_assignments (client_id, brand_head_id, assigned_at)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(client_id)
    .bind(brand_head_id)
    .bind(assigned_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(DatabaseError::on_unique("ClientAssignment for client", client_id))?;

    Ok(ClientAssignment {
        id,
        client_id,
        brand_head_id,
        assigned_at: assigned_at.to_string(),
    })
}

/// Assign a client to a brand head from its package pool.
///
/// `pick` receives the pool's loads (never empty) and returns the chosen
/// `brand_head_id`. Returning `None` or an ID outside the pool yields
/// `NoCandidates`. The load read, the insert, and marking the source lead
/// `Completed` commit together or not at all, including when the returned
/// future is dropped part way.
pub async fn assign_client<F>(pool: &SqlitePool, client_id: i64, pick: F) -> Result<AssignOutcome>
where
    F: FnOnce(&[BrandHeadLoad]) -> Option<i64>,
{
    let mut tx = begin_immediate(pool).await?;
    let outcome = assign_locked(&mut tx, client_id, pick).await?;
    tx.commit().await?;
    Ok(outcome)
}

async fn assign_locked<F>(
    conn: &mut SqliteConnection,
    client_id: i64,
    pick: F,
) -> Result<AssignOutcome>
where
    F: FnOnce(&[BrandHeadLoad]) -> Option<i64>,
{
    if let Some(existing) = get_assignment_on(conn, client_id).await? {
        return Ok(AssignOutcome::AlreadyAssigned(existing));
    }

    let client = sqlx::query_as::<_, Client>(
        r#"
        SELECT id, company_name, email, package, team_id, source_lead_id, created_at
        FROM clients
        WHERE id = ?
        "#,
    )
    .bind(client_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Client", client_id))?;

    let loads = package_loads_on(conn, &client.package).await?;
    if loads.is_empty() {
        return Ok(AssignOutcome::NoCandidates {
            package: client.package,
        });
    }

    let chosen = pick(&loads).and_then(|id| loads.into_iter().find(|l| l.brand_head_id == id));
    let Some(brand_head) = chosen else {
        return Ok(AssignOutcome::NoCandidates {
            package: client.package,
        });
    };

    let assignment =
        insert_assignment(conn, client_id, brand_head.brand_head_id, &timestamp_now()).await?;

    if let Some(lead_id) = client.source_lead_id {
        set_bd_lead_status(conn, lead_id, BdLeadStatus::Completed).await?;
    }

    tracing::debug!(
        client_id,
        brand_head_id = brand_head.brand_head_id,
        "Assignment written"
    );

    Ok(AssignOutcome::Assigned {
        assignment,
        brand_head,
        completed_lead_id: client.source_lead_id,
    })
}
