//! Network reachability.
//!
//! Connectivity can change within the lifetime of a single user action, so
//! callers re-check on every operation instead of caching the answer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

/// Reports current network reachability.
///
/// Implementations must fail open to `false`: if the reachability check
/// itself errors, the device is treated as offline, which never makes the
/// user believe a remote write succeeded when it did not.
#[async_trait]
pub trait ConnectivityMonitor: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Flag-backed monitor.  The app shell flips the flag from its platform
/// reachability callback; tests flip it to drive online/offline transitions.
#[derive(Clone)]
pub struct SharedConnectivity {
    online: Arc<AtomicBool>,
}

impl SharedConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityMonitor for SharedConnectivity {
    async fn is_connected(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

type Probe =
    Box<dyn Fn() -> BoxFuture<'static, std::io::Result<bool>> + Send + Sync>;

/// Monitor backed by an async probe (e.g. a platform reachability API).
/// A probe error is logged and reported as offline.
pub struct ProbeConnectivity {
    probe: Probe,
}

impl ProbeConnectivity {
    pub fn new<F>(probe: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, std::io::Result<bool>> + Send + Sync + 'static,
    {
        Self {
            probe: Box::new(probe),
        }
    }
}

#[async_trait]
impl ConnectivityMonitor for ProbeConnectivity {
    async fn is_connected(&self) -> bool {
        match (self.probe)().await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::warn!(error = %e, "reachability check failed, assuming offline");
                false
            }
        }
    }
}
