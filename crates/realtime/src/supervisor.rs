//! Connection supervision with reconnect and re-subscribe.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::RealtimeError;
use crate::reachability::Reachability;
use crate::types::{ConnectionState, RealtimeTransport};

/// Future returned by a re-subscribe callback.
pub type ResubscribeFuture = Pin<Box<dyn Future<Output = Result<(), RealtimeError>> + Send>>;

/// A callback that re-establishes one listener's subscriptions.
pub type ResubscribeFn = Arc<dyn Fn() -> ResubscribeFuture + Send + Sync>;

/// Configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before retrying when the network is unreachable.
    pub retry_delay: Duration,
    /// Maximum consecutive failed attempts (None = infinite).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Check if we should retry after the given number of attempts.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Result of a call to [`ConnectionSupervisor::reconnect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// Another reconnect is running; this call did nothing.
    InProgress,
    /// The transport was already open.
    AlreadyOpen,
    /// Network unreachable. A retry is scheduled unless attempts ran out.
    Offline { retry_in: Option<Duration> },
    /// The transport refused to connect. Retry scheduling matches `Offline`.
    Failed {
        reason: String,
        retry_in: Option<Duration>,
    },
    /// Reconnected and replayed every registered callback.
    Reconnected { resubscribed: usize },
}

struct Registration {
    name: String,
    callback: ResubscribeFn,
}

/// Keeps the realtime transport alive.
///
/// Listeners register a re-subscribe callback once. After every successful
/// reconnect each callback runs exactly once, in registration order. Only one
/// reconnect runs at a time; overlapping calls return
/// [`ReconnectOutcome::InProgress`]. At most one delayed retry is pending at
/// a time, whichever path the failure came from.
pub struct ConnectionSupervisor {
    transport: Arc<dyn RealtimeTransport>,
    reachability: Arc<dyn Reachability>,
    config: ReconnectConfig,
    reconnecting: AtomicBool,
    retry_pending: AtomicBool,
    failed_attempts: AtomicU32,
    callbacks: Mutex<Vec<Registration>>,
}

/// Clears the re-entrancy flag on every exit path.
struct ReconnectGuard<'a>(&'a AtomicBool);

impl Drop for ReconnectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectionSupervisor {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        reachability: Arc<dyn Reachability>,
        config: ReconnectConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            reachability,
            config,
            reconnecting: AtomicBool::new(false),
            retry_pending: AtomicBool::new(false),
            failed_attempts: AtomicU32::new(0),
            callbacks: Mutex::new(Vec::new()),
        })
    }

    /// Register a re-subscribe callback under a name used in logs.
    pub fn register<F, Fut>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RealtimeError>> + Send + 'static,
    {
        let callback: ResubscribeFn = Arc::new(move || Box::pin(callback()) as ResubscribeFuture);
        let name = name.into();
        debug!("Registered resubscribe callback {}", name);
        self.registry().push(Registration { name, callback });
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.registry().len()
    }

    /// Lock the callback registry, recovering it if a holder panicked.
    fn registry(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.callbacks.lock().unwrap_or_else(|poisoned| {
            error!("Resubscribe registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Current transport state.
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Whether a reconnect is currently running.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::Acquire)
    }

    /// Whether a delayed retry is waiting to fire.
    pub fn is_retry_pending(&self) -> bool {
        self.retry_pending.load(Ordering::Acquire)
    }

    /// Consecutive failed attempts since the last success.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts.load(Ordering::Acquire)
    }

    /// Attempt to restore the connection.
    pub async fn reconnect(self: &Arc<Self>) -> ReconnectOutcome {
        if self
            .reconnecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Reconnect already in progress");
            return ReconnectOutcome::InProgress;
        }
        let _guard = ReconnectGuard(&self.reconnecting);

        if self.transport.state() == ConnectionState::Open {
            self.failed_attempts.store(0, Ordering::Release);
            return ReconnectOutcome::AlreadyOpen;
        }

        if !self.reachability.is_online().await {
            let retry_in = self.record_failure();
            warn!("Network unreachable, realtime reconnect deferred ({:?})", retry_in);
            return ReconnectOutcome::Offline { retry_in };
        }

        if let Err(e) = self.transport.disconnect().await {
            warn!("Error while dropping realtime connection: {}", e);
        }

        if let Err(e) = self.transport.connect().await {
            let retry_in = self.record_failure();
            error!("Realtime connect failed: {}", e);
            return ReconnectOutcome::Failed {
                reason: e.to_string(),
                retry_in,
            };
        }

        self.failed_attempts.store(0, Ordering::Release);
        info!("Realtime connection restored");

        let resubscribed = self.resubscribe_all().await;
        ReconnectOutcome::Reconnected { resubscribed }
    }

    /// Spawn a task that reconnects whenever the transport is not open.
    pub fn spawn_watchdog(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let state = supervisor.transport.state();
                if state == ConnectionState::Open {
                    continue;
                }
                if supervisor.is_retry_pending() {
                    debug!("Realtime transport {:?}, retry already pending", state);
                    continue;
                }

                warn!("Realtime transport {:?}, reconnecting", state);
                let outcome = supervisor.reconnect().await;
                debug!("Watchdog reconnect outcome: {:?}", outcome);
            }
        })
    }

    async fn resubscribe_all(&self) -> usize {
        // Snapshot so callbacks may register without deadlocking.
        let snapshot: Vec<(String, ResubscribeFn)> = self
            .registry()
            .iter()
            .map(|r| (r.name.clone(), Arc::clone(&r.callback)))
            .collect();

        for (name, callback) in &snapshot {
            if let Err(e) = callback().await {
                error!("Resubscribe callback {} failed: {}", name, e);
            }
        }

        snapshot.len()
    }

    fn record_failure(self: &Arc<Self>) -> Option<Duration> {
        let attempts = self.failed_attempts.fetch_add(1, Ordering::AcqRel) + 1;
        if !self.config.should_retry(attempts) {
            error!("Giving up realtime reconnect after {} attempts", attempts);
            return None;
        }

        let delay = self.config.retry_delay;
        if self
            .retry_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.schedule_retry(delay);
        } else {
            debug!("Realtime retry already pending");
        }
        Some(delay)
    }

    fn schedule_retry(self: &Arc<Self>, delay: Duration) {
        let supervisor = Arc::clone(self);
        let retry: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
            tokio::time::sleep(delay).await;
            supervisor.retry_pending.store(false, Ordering::Release);
            let outcome = supervisor.reconnect().await;
            debug!("Scheduled reconnect outcome: {:?}", outcome);
        });
        tokio::spawn(retry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ChannelHub;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Network(AtomicBool);

    impl Network {
        fn new(online: bool) -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(online)))
        }

        fn set(&self, online: bool) {
            self.0.store(online, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Reachability for Network {
        async fn is_online(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Hub transport whose connect takes a while.
    struct SlowTransport {
        hub: ChannelHub,
        delay: Duration,
        connects: AtomicUsize,
    }

    #[async_trait]
    impl RealtimeTransport for SlowTransport {
        fn state(&self) -> ConnectionState {
            self.hub.state()
        }

        async fn disconnect(&self) -> Result<(), RealtimeError> {
            self.hub.disconnect().await
        }

        async fn connect(&self) -> Result<(), RealtimeError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.hub.connect().await
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl RealtimeTransport for RefusingTransport {
        fn state(&self) -> ConnectionState {
            ConnectionState::Closed
        }

        async fn disconnect(&self) -> Result<(), RealtimeError> {
            Ok(())
        }

        async fn connect(&self) -> Result<(), RealtimeError> {
            Err(RealtimeError::Transport("refused".to_string()))
        }
    }

    fn quick_config() -> ReconnectConfig {
        ReconnectConfig {
            retry_delay: Duration::from_millis(20),
            max_attempts: None,
        }
    }

    #[tokio::test]
    async fn test_already_open() {
        let hub = Arc::new(ChannelHub::new());
        let supervisor = ConnectionSupervisor::new(hub, Network::new(true), quick_config());
        assert_eq!(supervisor.reconnect().await, ReconnectOutcome::AlreadyOpen);
    }

    #[tokio::test]
    async fn test_callbacks_run_once_in_order() {
        let hub = Arc::new(ChannelHub::new());
        let supervisor = ConnectionSupervisor::new(hub.clone(), Network::new(true), quick_config());
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["clients", "leads", "batches"] {
            let order = order.clone();
            supervisor.register(name, move || {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push(name);
                    Ok(())
                }
            });
        }

        hub.close();
        assert_eq!(
            supervisor.reconnect().await,
            ReconnectOutcome::Reconnected { resubscribed: 3 }
        );
        assert_eq!(*order.lock().unwrap(), vec!["clients", "leads", "batches"]);
        assert_eq!(supervisor.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_failing_callback_does_not_stop_others() {
        let hub = Arc::new(ChannelHub::new());
        let supervisor = ConnectionSupervisor::new(hub.clone(), Network::new(true), quick_config());
        let ran = Arc::new(AtomicUsize::new(0));

        supervisor.register("broken", || async {
            Err(RealtimeError::Resubscribe {
                name: "broken".to_string(),
                reason: "boom".to_string(),
            })
        });
        let counter = ran.clone();
        supervisor.register("ok", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        hub.close();
        supervisor.reconnect().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reconnects_run_once() {
        let transport = Arc::new(SlowTransport {
            hub: ChannelHub::new(),
            delay: Duration::from_millis(50),
            connects: AtomicUsize::new(0),
        });
        transport.hub.close();

        let supervisor =
            ConnectionSupervisor::new(transport.clone(), Network::new(true), quick_config());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        supervisor.register("listener", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let outcomes = futures::future::join_all((0..5).map(|_| {
            let supervisor = supervisor.clone();
            async move { supervisor.reconnect().await }
        }))
        .await;

        let reconnected = outcomes
            .iter()
            .filter(|o| matches!(o, ReconnectOutcome::Reconnected { .. }))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| **o == ReconnectOutcome::InProgress)
            .count();

        assert_eq!(reconnected, 1);
        assert_eq!(skipped, 4);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!supervisor.is_reconnecting());
    }

    #[tokio::test]
    async fn test_offline_schedules_retry() {
        let hub = Arc::new(ChannelHub::new());
        hub.close();
        let network = Network::new(false);
        let supervisor = ConnectionSupervisor::new(hub.clone(), network.clone(), quick_config());

        assert_eq!(
            supervisor.reconnect().await,
            ReconnectOutcome::Offline {
                retry_in: Some(Duration::from_millis(20))
            }
        );
        assert_eq!(supervisor.failed_attempts(), 1);

        network.set(true);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(hub.state(), ConnectionState::Open);
        assert_eq!(supervisor.failed_attempts(), 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let config = ReconnectConfig {
            retry_delay: Duration::from_millis(10),
            max_attempts: Some(3),
        };
        let supervisor =
            ConnectionSupervisor::new(Arc::new(RefusingTransport), Network::new(true), config);

        let first = supervisor.reconnect().await;
        assert!(matches!(first, ReconnectOutcome::Failed { retry_in: Some(_), .. }));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(supervisor.failed_attempts(), 3);
        assert!(!supervisor.is_reconnecting());
    }

    #[tokio::test]
    async fn test_watchdog_restores_dropped_transport() {
        let hub = Arc::new(ChannelHub::new());
        let supervisor = ConnectionSupervisor::new(hub.clone(), Network::new(true), quick_config());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        supervisor.register("listener", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let watchdog = supervisor.spawn_watchdog(Duration::from_millis(10));
        hub.close();
        tokio::time::sleep(Duration::from_millis(100)).await;
        watchdog.abort();

        assert_eq!(hub.state(), ConnectionState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Always offline; counts how often it was asked.
    #[derive(Default)]
    struct CountingOffline(AtomicUsize);

    #[async_trait]
    impl Reachability for CountingOffline {
        async fn is_online(&self) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    #[tokio::test]
    async fn test_watchdog_and_retries_share_one_chain() {
        let hub = Arc::new(ChannelHub::new());
        hub.close();
        let network = Arc::new(CountingOffline::default());
        let config = ReconnectConfig {
            retry_delay: Duration::from_millis(50),
            max_attempts: None,
        };
        let supervisor = ConnectionSupervisor::new(hub, network.clone(), config);

        let watchdog = supervisor.spawn_watchdog(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(500)).await;
        watchdog.abort();

        // One chain retries about every 50ms. A chain per failure would
        // multiply with every watchdog tick.
        let checks = network.0.load(Ordering::SeqCst);
        assert!(checks >= 3, "only {checks} reachability checks");
        assert!(checks <= 25, "{checks} reachability checks in 500ms");
        assert!(supervisor.is_retry_pending());
    }

    #[tokio::test]
    async fn test_registry_survives_poisoned_lock() {
        let hub = Arc::new(ChannelHub::new());
        let supervisor = ConnectionSupervisor::new(hub.clone(), Network::new(true), quick_config());

        let poisoner = supervisor.clone();
        let _ = std::thread::spawn(move || {
            let _held = poisoner.callbacks.lock().unwrap();
            panic!("listener panicked while registering");
        })
        .join();
        assert!(supervisor.callbacks.is_poisoned());

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        supervisor.register("after-panic", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        assert_eq!(supervisor.callback_count(), 1);

        hub.close();
        assert_eq!(
            supervisor.reconnect().await,
            ReconnectOutcome::Reconnected { resubscribed: 1 }
        );
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
