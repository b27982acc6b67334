//! Connectivity signal plumbing.
//!
//! The host application owns the actual network detection (OS callbacks,
//! heartbeat probes, whatever fits the platform) and reports transitions
//! through a [`ConnectivityHandle`]. The sync manager holds the matching
//! watch receiver: it reads the current flag at sync time and reacts to
//! transitions in its background loop.

use tokio::sync::watch;

/// Host-facing sender half of the connectivity signal.
#[derive(Clone)]
pub struct ConnectivityHandle {
    tx: watch::Sender<bool>,
}

impl ConnectivityHandle {
    /// Reports the current connectivity state. Repeated reports of the
    /// same state are deduplicated and wake no one.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Creates the connectivity signal pair.
pub fn connectivity_channel(initially_online: bool) -> (ConnectivityHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(initially_online);
    (ConnectivityHandle { tx }, rx)
}
