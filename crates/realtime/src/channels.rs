//! Channel names.

/// Broadcasts to business developers when a lead is handed off.
pub const BD_CHANGES: &str = "BD-changes-channel";

/// Broadcasts when the CMO's quarterly projections change.
pub const PROJECTIONS: &str = "projections";

/// Per-user notification channel.
pub fn private_notifications(user_id: i64) -> String {
    format!("private-notifications-{}", user_id)
}

/// Change feed for a table.
pub fn table_changes(table: &str) -> String {
    format!("postgres_changes:{}", table)
}

/// Tables with change feeds.
pub mod tables {
    pub const CLIENTS: &str = "clients";
    pub const TELECALLER_LEADS: &str = "telecaller_leads";
    pub const BD_LEADS: &str = "bd_leads";
    pub const CONTENT_BATCHES: &str = "content_batches";
    pub const DESIGNER_SUBMISSIONS: &str = "designer_submissions";
    pub const HELP_TICKETS: &str = "help_tickets";
}
