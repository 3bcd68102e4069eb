//! Change-feed listeners that survive reconnects.

use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use realtime::{ChangeEvent, ChannelHub, ConnectionSupervisor, RealtimeError, RealtimeMessage};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Reacts to row changes on one table.
#[async_trait]
pub trait ChangeHandler: Send + Sync + 'static {
    async fn handle(&self, event: ChangeEvent);
}

struct Running {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns a subscription to a table's change feed and a task draining it.
///
/// The listener registers itself with the supervisor, so after every
/// reconnect it tears down the dead subscription and subscribes again.
pub struct ChangeListener {
    name: String,
    table: String,
    hub: Arc<ChannelHub>,
    handler: Arc<dyn ChangeHandler>,
    running: Mutex<Option<Running>>,
}

impl ChangeListener {
    /// Subscribe now and register for re-subscription.
    pub fn start(
        name: impl Into<String>,
        table: impl Into<String>,
        hub: Arc<ChannelHub>,
        handler: Arc<dyn ChangeHandler>,
        supervisor: &ConnectionSupervisor,
    ) -> Result<Arc<Self>, RealtimeError> {
        let listener = Arc::new(Self {
            name: name.into(),
            table: table.into(),
            hub,
            handler,
            running: Mutex::new(None),
        });

        listener.subscribe()?;

        let weak: Weak<Self> = Arc::downgrade(&listener);
        supervisor.register(listener.name.clone(), move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(listener) => listener.subscribe(),
                    None => Ok(()),
                }
            }
        });

        Ok(listener)
    }

    /// Replace the current subscription with a fresh one.
    pub fn subscribe(&self) -> Result<(), RealtimeError> {
        self.stop();

        let mut subscription = self.hub.subscribe_changes(&self.table)?;
        let (stop, mut stopped) = oneshot::channel::<()>();
        let hub = Arc::clone(&self.hub);
        let handler = Arc::clone(&self.handler);
        let name = self.name.clone();

        let handle = tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = &mut stopped => None,
                    message = subscription.recv() => Some(message),
                };

                match message {
                    None => {
                        // Best effort; the channel may already be gone.
                        if let Err(e) = hub.unsubscribe(subscription) {
                            debug!("{} unsubscribe failed: {}", name, e);
                        }
                        break;
                    }
                    Some(Ok(RealtimeMessage::PostgresChanges(event))) => {
                        handler.handle(event).await
                    }
                    Some(Ok(RealtimeMessage::Broadcast { event, .. })) => {
                        debug!("{} ignoring broadcast {}", name, event);
                    }
                    Some(Err(e)) => {
                        info!("{} subscription ended: {}", name, e);
                        break;
                    }
                }
            }
        });

        if let Ok(mut running) = self.running.lock() {
            *running = Some(Running { stop, handle });
        }
        debug!("{} subscribed to {}", self.name, self.table);
        Ok(())
    }

    /// Tear down the current subscription.
    pub fn stop(&self) {
        let previous = self.running.lock().ok().and_then(|mut r| r.take());
        if let Some(running) = previous {
            // The task may already have exited on a closed channel.
            let _ = running.stop.send(());
        }
    }

    /// Whether the draining task is alive.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|r| r.as_ref().is_some_and(|r| !r.handle.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use realtime::{Reachability, ReconnectConfig};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl ChangeHandler for Counter {
        async fn handle(&self, _event: ChangeEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Online;

    #[async_trait]
    impl Reachability for Online {
        async fn is_online(&self) -> bool {
            true
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn test_resubscribes_after_reconnect() {
        let hub = Arc::new(ChannelHub::new());
        let supervisor =
            ConnectionSupervisor::new(hub.clone(), Arc::new(Online), ReconnectConfig::default());
        let counter = Arc::new(Counter::default());

        let listener =
            ChangeListener::start("test", "clients", hub.clone(), counter.clone(), &supervisor)
                .unwrap();
        assert_eq!(supervisor.callback_count(), 1);

        hub.publish_change(ChangeEvent::insert("clients", json!({"id": 1})))
            .unwrap();
        settle().await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        hub.close();
        settle().await;
        assert!(!listener.is_running());

        supervisor.reconnect().await;
        assert!(listener.is_running());
        assert_eq!(hub.subscriber_count("postgres_changes:clients"), 1);

        hub.publish_change(ChangeEvent::insert("clients", json!({"id": 2})))
            .unwrap();
        settle().await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_unsubscribes() {
        let hub = Arc::new(ChannelHub::new());
        let supervisor =
            ConnectionSupervisor::new(hub.clone(), Arc::new(Online), ReconnectConfig::default());

        let listener = ChangeListener::start(
            "test",
            "clients",
            hub.clone(),
            Arc::new(Counter::default()),
            &supervisor,
        )
        .unwrap();
        assert_eq!(hub.subscriber_count("postgres_changes:clients"), 1);

        listener.stop();
        settle().await;
        assert_eq!(hub.subscriber_count("postgres_changes:clients"), 0);
        assert!(!listener.is_running());
    }
}
