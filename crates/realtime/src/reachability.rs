//! Network reachability probing.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::lookup_host;
use tracing::debug;

/// Answers whether the network looks usable before a reconnect attempt.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Treats a successful DNS resolution of a known host as "online".
#[derive(Debug, Clone)]
pub struct DnsReachability {
    host: String,
    port: u16,
    timeout: Duration,
}

impl DnsReachability {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 443,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Reachability for DnsReachability {
    async fn is_online(&self) -> bool {
        let target = format!("{}:{}", self.host, self.port);
        match tokio::time::timeout(self.timeout, lookup_host(target)).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                debug!("Reachability lookup for {} failed: {}", self.host, e);
                false
            }
            Err(_) => {
                debug!("Reachability lookup for {} timed out", self.host);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_localhost_is_reachable() {
        let reachability = DnsReachability::new("localhost");
        assert!(reachability.is_online().await);
    }

    #[tokio::test]
    async fn test_invalid_host_is_offline() {
        let reachability = DnsReachability::new("no-such-host.invalid")
            .with_timeout(Duration::from_secs(2));
        assert!(!reachability.is_online().await);
    }
}
