//! Client CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Client, NewClient};
use crate::timestamp_now;

/// Create a new client.
///
/// A business-developer lead opens at most one account; a second client for
/// the same `source_lead_id` is `AlreadyExists`.
pub async fn create_client(pool: &SqlitePool, client: &NewClient) -> Result<Client> {
    let created_at = timestamp_now();
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO clients (company_name, email, package, source_lead_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&client.company_name)
    .bind(&client.email)
    .bind(&client.package)
    .bind(client.source_lead_id)
    .bind(&created_at)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::on_unique(
        "Client for lead",
        client.source_lead_id.map_or_else(String::new, |id| id.to_string()),
    ))?;

    Ok(Client {
        id,
        company_name: client.company_name.clone(),
        email: client.email.clone(),
        package: client.package.clone(),
        team_id: None,
        source_lead_id: client.source_lead_id,
        created_at,
    })
}

/// Get a client by ID.
pub async fn get_client(pool: &SqlitePool, id: i64) -> Result<Client> {
    sqlx::query_as::<_, Client>(
        r#"
        SELECT id, company_name, email, package, team_id, source_lead_id, created_at
        FROM clients
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Client", id))
}

/// List clients assigned to a brand head, most recent assignment first.
pub async fn list_clients_for_brand_head(pool: &SqlitePool, brand_head_id: i64) -> Result<Vec<Client>> {
    let clients = sqlx::query_as::<_, Client>(
        r#"
        SELECT c.id, c.company_name, c.email, c.package, c.team_id, c.source_lead_id, c.created_at
        FROM clients c
        INNER JOIN client_assignments ca ON ca.client_id = c.id
        WHERE ca.brand_head_id = ?
        ORDER BY ca.assigned_at DESC, ca.id DESC
        "#,
    )
    .bind(brand_head_id)
    .fetch_all(pool)
    .await?;

    Ok(clients)
}
