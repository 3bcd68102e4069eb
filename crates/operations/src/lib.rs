//! Services for the agency operations platform.
//!
//! Each service owns a slice of the business flow and reports through the
//! realtime hub:
//!
//! - [`LeadHandoff`] - Telecaller leads and their handoff to business developers
//! - [`Onboarding`] - Client accounts created from closed leads
//! - [`AssignmentResolver`] - Least-loaded brand-head assignment for new clients
//! - [`ContentWorkflow`] - Batches, posts, reviews and help tickets
//!
//! Listeners ([`ClientInsertListener`], [`LeadStatusListener`]) run behind a
//! [`ChangeListener`], which re-subscribes after every reconnect.

pub mod assignment;
pub mod content;
mod error;
pub mod handoff;
pub mod listener;
pub mod onboarding;
mod publisher;
pub mod testing;

pub use assignment::{AssignmentResolver, ClientInsertListener, ResolvedAssignment};
pub use content::{BatchView, ContentWorkflow, PostUpdate};
pub use error::{OperationsError, Result};
pub use handoff::{LeadHandoff, LeadStatusListener};
pub use listener::{ChangeHandler, ChangeListener};
pub use onboarding::{NewClientAccount, Onboarding};
pub use publisher::Publisher;

#[cfg(test)]
pub(crate) mod test_support {
    use database::Database;
    use tempfile::TempDir;

    /// A migrated file database with several pooled connections, so writers
    /// really run side by side. Keep the directory alive for the test.
    pub async fn file_db(pool_size: u32) -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("agency.db").display());
        let db = Database::connect_with_pool_size(&url, pool_size)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        (dir, db)
    }
}
