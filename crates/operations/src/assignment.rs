//! Brand-head assignment for new clients.

use std::sync::Arc;

use async_trait::async_trait;
use database::assignment::{self, AssignOutcome};
use database::{client, BrandHeadLoad, Client, ClientAssignment};
use mailer::{templates, Mailer};
use realtime::channels::{self, tables};
use realtime::{ChangeEvent, ChangeKind};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument, warn};
use workflow_core::resolve_least_loaded;

use crate::error::{OperationsError, Result};
use crate::listener::ChangeHandler;
use crate::publisher::Publisher;

/// What [`AssignmentResolver::handle_client_insert`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAssignment {
    pub assignment: ClientAssignment,
    /// False when the client already had an assignment (re-delivered event).
    pub newly_assigned: bool,
    /// Whether the welcome email went out. Never true for re-deliveries.
    pub email_sent: bool,
}

/// Assigns each new client to the least-loaded brand head of its package.
pub struct AssignmentResolver {
    pool: SqlitePool,
    mailer: Arc<dyn Mailer>,
    publisher: Publisher,
}

impl AssignmentResolver {
    pub fn new(pool: SqlitePool, mailer: Arc<dyn Mailer>, publisher: Publisher) -> Self {
        Self {
            pool,
            mailer,
            publisher,
        }
    }

    /// Assign a freshly inserted client.
    ///
    /// Safe to call more than once for the same client: later calls return
    /// the existing assignment without writing or emailing.
    #[instrument(skip(self))]
    pub async fn handle_client_insert(&self, client_id: i64) -> Result<ResolvedAssignment> {
        let outcome = assignment::assign_client(&self.pool, client_id, pick_brand_head).await?;

        match outcome {
            AssignOutcome::Assigned {
                assignment,
                brand_head,
                completed_lead_id,
            } => {
                info!(
                    client_id,
                    brand_head_id = brand_head.brand_head_id,
                    load = brand_head.assignment_count,
                    "Client assigned"
                );

                let client = client::get_client(&self.pool, client_id).await?;
                let email_sent = self.send_welcome(&brand_head, &client).await;
                self.announce(&assignment, &client, completed_lead_id).await;

                Ok(ResolvedAssignment {
                    assignment,
                    newly_assigned: true,
                    email_sent,
                })
            }
            AssignOutcome::AlreadyAssigned(assignment) => {
                debug!(
                    client_id,
                    brand_head_id = assignment.brand_head_id,
                    "Client already assigned, skipping"
                );
                Ok(ResolvedAssignment {
                    assignment,
                    newly_assigned: false,
                    email_sent: false,
                })
            }
            AssignOutcome::NoCandidates { package } => {
                error!(client_id, package = %package, "No brand head serves package");
                Err(OperationsError::NoBrandHead { package })
            }
        }
    }

    /// The assignment stands even if the email fails.
    async fn send_welcome(&self, brand_head: &BrandHeadLoad, client: &Client) -> bool {
        let sent = match templates::welcome_brand_head(
            &brand_head.email,
            &brand_head.name,
            &client.company_name,
            &client.package,
        ) {
            Ok(email) => self.mailer.send(&email).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    brand_head_id = brand_head.brand_head_id,
                    client_id = client.id,
                    "Welcome email failed: {}",
                    e
                );
                false
            }
        }
    }

    async fn announce(
        &self,
        assignment: &ClientAssignment,
        client: &Client,
        completed_lead_id: Option<i64>,
    ) {
        self.publisher.change(ChangeEvent::update(
            tables::CLIENTS,
            json!({
                "id": client.id,
                "company_name": client.company_name,
                "package": client.package,
                "brand_head_id": assignment.brand_head_id,
            }),
        ));

        if let Some(lead_id) = completed_lead_id {
            self.publisher.change(ChangeEvent::update(
                tables::BD_LEADS,
                json!({ "id": lead_id, "status": "Completed" }),
            ));
        }

        self.publisher
            .broadcast(
                &channels::private_notifications(assignment.brand_head_id),
                "new-client",
                json!({
                    "clientId": client.id,
                    "companyName": client.company_name,
                    "package": client.package,
                }),
            )
            .await;
    }
}

fn pick_brand_head(loads: &[BrandHeadLoad]) -> Option<i64> {
    resolve_least_loaded(
        loads,
        |l| l.assignment_count,
        |l| l.last_assigned_at.clone(),
    )
    .map(|l| l.brand_head_id)
}

/// Runs the resolver for every insert on the `clients` feed.
pub struct ClientInsertListener {
    resolver: Arc<AssignmentResolver>,
}

impl ClientInsertListener {
    pub fn new(resolver: Arc<AssignmentResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ChangeHandler for ClientInsertListener {
    async fn handle(&self, event: ChangeEvent) {
        if event.kind != ChangeKind::Insert {
            return;
        }

        let Some(client_id) = event.id_field("id") else {
            warn!("Client insert without id: {}", event.record);
            return;
        };

        match self.resolver.handle_client_insert(client_id).await {
            Ok(resolved) => debug!(
                client_id,
                newly_assigned = resolved.newly_assigned,
                "Client insert handled"
            ),
            Err(e) if e.is_transient() => error!(client_id, "Assignment failed, retryable: {}", e),
            Err(e) => warn!(client_id, "Assignment failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ChangeListener;
    use crate::test_support::file_db;
    use crate::testing::{FailingMailer, RecordingMailer};
    use database::models::{NewClient, NewStaff};
    use database::{staff, Database, StaffRole};
    use realtime::{
        ChannelHub, ConnectionSupervisor, Reachability, RealtimeMessage, ReconnectConfig,
    };
    use std::time::Duration;

    struct Fixture {
        db: Database,
        hub: Arc<ChannelHub>,
        mailer: Arc<RecordingMailer>,
        resolver: Arc<AssignmentResolver>,
    }

    async fn fixture() -> Fixture {
        fixture_on(Database::in_memory().await.unwrap()).await
    }

    async fn fixture_on(db: Database) -> Fixture {
        let hub = Arc::new(ChannelHub::new());
        let mailer = Arc::new(RecordingMailer::new());
        let publisher = Publisher::new(hub.clone(), db.pool().clone());
        let resolver = Arc::new(AssignmentResolver::new(
            db.pool().clone(),
            mailer.clone(),
            publisher,
        ));
        Fixture {
            db,
            hub,
            mailer,
            resolver,
        }
    }

    async fn brand_head(db: &Database, name: &str, package: &str) -> i64 {
        let email = format!("{}@agency.test", name.to_lowercase());
        let head = staff::create_staff(db.pool(), &NewStaff::new(name, email, StaffRole::BrandHead))
            .await
            .unwrap();
        assignment::add_package(db.pool(), head.id, package).await.unwrap();
        head.id
    }

    async fn new_client(db: &Database, name: &str, package: &str) -> i64 {
        client::create_client(
            db.pool(),
            &NewClient {
                company_name: name.to_string(),
                email: format!("{}@client.test", name.to_lowercase()),
                package: package.to_string(),
                source_lead_id: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn seed_assignment(db: &Database, brand_head_id: i64, assigned_at: &str) {
        let client_id = new_client(db, "Seed", "SEED").await;
        assignment::record_assignment(db.pool(), client_id, brand_head_id, assigned_at)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_tie_goes_to_oldest_assignment() {
        let f = fixture().await;
        let a = brand_head(&f.db, "A", "SPARK").await;
        let b = brand_head(&f.db, "B", "SPARK").await;

        for (i, ts) in ["2024-01-01T00:00:00.000000Z", "2024-01-02T00:00:00.000000Z", "2024-01-03T00:00:00.000000Z"]
            .iter()
            .enumerate()
        {
            let c = new_client(&f.db, &format!("OldA{}", i), "SEED").await;
            assignment::record_assignment(f.db.pool(), c, a, ts).await.unwrap();
        }
        for (i, ts) in ["2024-02-01T00:00:00.000000Z", "2024-02-02T00:00:00.000000Z", "2024-02-03T00:00:00.000000Z"]
            .iter()
            .enumerate()
        {
            let c = new_client(&f.db, &format!("OldB{}", i), "SEED").await;
            assignment::record_assignment(f.db.pool(), c, b, ts).await.unwrap();
        }

        let client_id = new_client(&f.db, "Acme", "SPARK").await;
        let resolved = f.resolver.handle_client_insert(client_id).await.unwrap();

        assert!(resolved.newly_assigned);
        assert_eq!(resolved.assignment.brand_head_id, a);
        assert!(resolved.email_sent);

        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["a@agency.test".to_string()]);
        assert!(sent[0].subject.contains("Acme"));
    }

    #[tokio::test]
    async fn test_least_loaded_wins() {
        let f = fixture().await;
        let busy = brand_head(&f.db, "Busy", "SPARK").await;
        let idle = brand_head(&f.db, "Idle", "SPARK").await;
        seed_assignment(&f.db, busy, "2024-01-01T00:00:00.000000Z").await;

        let client_id = new_client(&f.db, "Acme", "SPARK").await;
        let resolved = f.resolver.handle_client_insert(client_id).await.unwrap();
        assert_eq!(resolved.assignment.brand_head_id, idle);
    }

    #[tokio::test]
    async fn test_redelivery_does_not_double_assign() {
        let f = fixture().await;
        brand_head(&f.db, "A", "SPARK").await;
        let client_id = new_client(&f.db, "Acme", "SPARK").await;

        let first = f.resolver.handle_client_insert(client_id).await.unwrap();
        let second = f.resolver.handle_client_insert(client_id).await.unwrap();

        assert!(first.newly_assigned);
        assert!(!second.newly_assigned);
        assert_eq!(first.assignment, second.assignment);
        assert_eq!(f.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_email_failure_keeps_assignment() {
        let db = Database::in_memory().await.unwrap();
        let hub = Arc::new(ChannelHub::new());
        let publisher = Publisher::new(hub, db.pool().clone());
        let resolver =
            AssignmentResolver::new(db.pool().clone(), Arc::new(FailingMailer), publisher);

        let head = brand_head(&db, "A", "SPARK").await;
        let client_id = new_client(&db, "Acme", "SPARK").await;

        let resolved = resolver.handle_client_insert(client_id).await.unwrap();
        assert!(resolved.newly_assigned);
        assert!(!resolved.email_sent);

        let stored = assignment::get_assignment(db.pool(), client_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.brand_head_id, head);
    }

    #[tokio::test]
    async fn test_no_brand_head() {
        let f = fixture().await;
        let client_id = new_client(&f.db, "Acme", "ORPHAN").await;

        let err = f.resolver.handle_client_insert(client_id).await.unwrap_err();
        assert!(matches!(err, OperationsError::NoBrandHead { ref package } if package == "ORPHAN"));
        assert!(!err.is_transient());
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_assignment_notifies_brand_head() {
        let f = fixture().await;
        let head = brand_head(&f.db, "A", "SPARK").await;
        let mut inbox = f
            .hub
            .subscribe(&channels::private_notifications(head))
            .unwrap();

        let client_id = new_client(&f.db, "Acme", "SPARK").await;
        f.resolver.handle_client_insert(client_id).await.unwrap();

        match inbox.recv().await.unwrap() {
            RealtimeMessage::Broadcast { event, payload } => {
                assert_eq!(event, "new-client");
                assert_eq!(payload["clientId"], client_id);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let logged = database::broadcast_log::recent(
            f.db.pool(),
            &channels::private_notifications(head),
            10,
        )
        .await
        .unwrap();
        assert_eq!(logged.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_spread_load() {
        let (_dir, db) = file_db(4).await;
        let f = fixture_on(db).await;
        let a = brand_head(&f.db, "A", "SPARK").await;
        let b = brand_head(&f.db, "B", "SPARK").await;

        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(new_client(&f.db, &format!("Client{}", i), "SPARK").await);
        }

        let tasks = ids.iter().map(|&id| {
            let resolver = f.resolver.clone();
            tokio::spawn(async move { resolver.handle_client_insert(id).await })
        });
        let results = futures::future::join_all(tasks).await;

        let mut per_head = std::collections::HashMap::new();
        for result in results {
            let resolved = result.unwrap().unwrap();
            assert!(resolved.newly_assigned);
            *per_head.entry(resolved.assignment.brand_head_id).or_insert(0) += 1;
        }
        assert_eq!(per_head.get(&a), Some(&4));
        assert_eq!(per_head.get(&b), Some(&4));
    }

    struct AlwaysOnline;

    #[async_trait]
    impl Reachability for AlwaysOnline {
        async fn is_online(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_listener_assigns_after_reconnect() {
        let f = fixture().await;
        let head = brand_head(&f.db, "A", "SPARK").await;
        let supervisor = ConnectionSupervisor::new(
            f.hub.clone(),
            Arc::new(AlwaysOnline),
            ReconnectConfig::default(),
        );

        let _listener = ChangeListener::start(
            "client-inserts",
            tables::CLIENTS,
            f.hub.clone(),
            Arc::new(ClientInsertListener::new(f.resolver.clone())),
            &supervisor,
        )
        .unwrap();

        f.hub.close();
        supervisor.reconnect().await;

        let client_id = new_client(&f.db, "Acme", "SPARK").await;
        f.hub
            .publish_change(ChangeEvent::insert(tables::CLIENTS, json!({ "id": client_id })))
            .unwrap();

        let mut assigned = None;
        for _ in 0..50 {
            assigned = assignment::get_assignment(f.db.pool(), client_id).await.unwrap();
            if assigned.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(assigned.map(|a| a.brand_head_id), Some(head));
    }
}
