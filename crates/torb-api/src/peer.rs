// HTTP invalidation transport
// Decision: Fire-and-forget GETs on a spawned task, bounded by a client timeout
// Decision: Failures are logged at warn and dropped; no retry, no acknowledgment

use std::sync::Arc;

use anyhow::{Context, Result};
use torb_core::{InvalidationTransport, NoopTransport};
use tracing::{debug, warn};

use crate::config::PeerConfig;

/// Notifies the peer node over its `/cacheInvalidate` endpoints
#[derive(Clone)]
pub struct HttpInvalidationTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInvalidationTransport {
    pub fn new(config: &PeerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build peer HTTP client")?;

        let address = config.address.trim_end_matches('/');
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        Ok(Self { client, base_url })
    }

    pub fn user_url(&self, user_id: i64) -> String {
        format!("{}/cacheInvalidate/user/{}", self.base_url, user_id)
    }

    pub fn index_url(&self) -> String {
        format!("{}/cacheInvalidate/index", self.base_url)
    }

    fn fire(&self, url: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(%url, "No async runtime, peer notification dropped");
            return;
        };

        let client = self.client.clone();
        handle.spawn(async move {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(%url, "Peer cache invalidated");
                }
                Ok(resp) => {
                    warn!(%url, status = %resp.status(), "Peer rejected invalidation");
                }
                Err(e) => {
                    warn!(%url, error = %e, "Peer invalidation failed");
                }
            }
        });
    }
}

impl InvalidationTransport for HttpInvalidationTransport {
    fn notify_user_invalidated(&self, user_id: i64) {
        self.fire(self.user_url(user_id));
    }

    fn notify_index_invalidated(&self) {
        self.fire(self.index_url());
    }
}

/// HTTP transport when a peer is configured, no-op otherwise
pub fn build_transport(peer: Option<&PeerConfig>) -> Result<Arc<dyn InvalidationTransport>> {
    match peer {
        Some(config) => {
            let transport = HttpInvalidationTransport::new(config)?;
            tracing::info!(peer = %transport.base_url, timeout = ?config.timeout, "Peer invalidation enabled");
            Ok(Arc::new(transport))
        }
        None => {
            tracing::info!("No peer configured, running as a single node");
            Ok(Arc::new(NoopTransport))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn peer(address: &str) -> PeerConfig {
        PeerConfig {
            address: address.to_string(),
            timeout: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_urls_from_host_port() {
        let transport = HttpInvalidationTransport::new(&peer("10.0.0.2:8080")).unwrap();
        assert_eq!(
            transport.user_url(42),
            "http://10.0.0.2:8080/cacheInvalidate/user/42"
        );
        assert_eq!(
            transport.index_url(),
            "http://10.0.0.2:8080/cacheInvalidate/index"
        );
    }

    #[test]
    fn test_urls_keep_explicit_scheme() {
        let transport = HttpInvalidationTransport::new(&peer("https://peer.local/")).unwrap();
        assert_eq!(transport.index_url(), "https://peer.local/cacheInvalidate/index");
    }

    #[test]
    fn test_outside_runtime_is_dropped() {
        let transport = HttpInvalidationTransport::new(&peer("127.0.0.1:1")).unwrap();
        transport.notify_user_invalidated(1);
        transport.notify_index_invalidated();
    }

    #[tokio::test]
    async fn test_unreachable_peer_never_surfaces() {
        let transport = HttpInvalidationTransport::new(&peer("127.0.0.1:1")).unwrap();
        transport.notify_user_invalidated(1);
        transport.notify_index_invalidated();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
