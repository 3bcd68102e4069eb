//! Staff CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewStaff, Staff, StaffRole};
use crate::timestamp_now;

/// Create a new staff member.
pub async fn create_staff(pool: &SqlitePool, staff: &NewStaff) -> Result<Staff> {
    let created_at = timestamp_now();
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO staff (name, email, role, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&staff.name)
    .bind(&staff.email)
    .bind(staff.role.as_str())
    .bind(&created_at)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::on_unique("Staff", &staff.email))?;

    Ok(Staff {
        id,
        name: staff.name.clone(),
        email: staff.email.clone(),
        role: staff.role.as_str().to_string(),
        created_at,
    })
}

/// Get a staff member by ID.
pub async fn get_staff(pool: &SqlitePool, id: i64) -> Result<Staff> {
    sqlx::query_as::<_, Staff>(
        r#"
        SELECT id, name, email, role, created_at
        FROM staff
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Staff", id))
}

/// Get a staff member and check they hold the expected role.
pub async fn get_with_role(pool: &SqlitePool, id: i64, role: StaffRole) -> Result<Staff> {
    let staff = get_staff(pool, id).await?;
    if staff.role()? != role {
        return Err(DatabaseError::NotFound {
            entity: "Staff with role",
            id: format!("{}/{}", id, role),
        });
    }
    Ok(staff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_staff, test_db};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let created = add_staff(&db, "Ravi", StaffRole::Telecaller).await;

        let fetched = get_staff(db.pool(), created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.role().unwrap(), StaffRole::Telecaller);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = test_db().await;
        add_staff(&db, "Ravi", StaffRole::Telecaller).await;

        let result = create_staff(
            db.pool(),
            &NewStaff::new("Ravi Two", "ravi@agency.test", StaffRole::Designer),
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_role_filtering() {
        let db = test_db().await;
        let head = add_staff(&db, "Meera", StaffRole::BrandHead).await;

        assert!(get_with_role(db.pool(), head.id, StaffRole::BrandHead).await.is_ok());
        let wrong = get_with_role(db.pool(), head.id, StaffRole::Designer).await;
        assert!(matches!(wrong, Err(DatabaseError::NotFound { .. })));
    }
}
