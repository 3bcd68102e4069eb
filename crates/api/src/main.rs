//! Agency operations API server.
//!
//! Serves the JSON API and runs the realtime listeners (client assignment,
//! lead status) under a connection supervisor.

use std::sync::Arc;

use api::{AppState, Config};
use database::Database;
use mailer::{DisabledMailer, Mailer, MailerConfig, SmtpMailer};
use operations::{ChangeListener, ClientInsertListener};
use realtime::channels::tables;
use realtime::{ChannelHub, ConnectionSupervisor, DnsReachability, ReconnectConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting agency API");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let mailer: Arc<dyn Mailer> = match MailerConfig::from_env() {
        Ok(mail_config) => Arc::new(SmtpMailer::new(mail_config)?),
        Err(e) => {
            warn!("Email disabled: {}", e);
            Arc::new(DisabledMailer)
        }
    };

    let hub = Arc::new(ChannelHub::new());
    let state = AppState::new(db.clone(), hub.clone(), mailer);

    let supervisor = ConnectionSupervisor::new(
        hub.clone(),
        Arc::new(DnsReachability::new(config.realtime_probe_host.clone())),
        ReconnectConfig {
            retry_delay: config.realtime_retry,
            max_attempts: None,
        },
    );

    let _client_inserts = ChangeListener::start(
        "client-inserts",
        tables::CLIENTS,
        hub.clone(),
        Arc::new(ClientInsertListener::new(state.resolver.clone())),
        &supervisor,
    )?;
    let _lead_status = ChangeListener::start(
        "lead-status",
        tables::TELECALLER_LEADS,
        hub.clone(),
        state.lead_counts.clone(),
        &supervisor,
    )?;
    let watchdog = supervisor.spawn_watchdog(config.realtime_watchdog);

    let app = api::app(state);

    info!(addr = %config.addr, "Agency API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    watchdog.abort();
    db.close().await;
    Ok(())
}
