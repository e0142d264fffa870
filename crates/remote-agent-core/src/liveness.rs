//! Single-writer liveness flags.
//!
//! The agent tracks two independent signals: controller reachability (probe
//! loop) and the persistent connection (connection manager). Each signal has
//! exactly one [`LivenessFlag`] owned by the task that drives it; everyone
//! else holds a [`LivenessWatch`].

use serde::Serialize;
use tokio::sync::watch;

/// Create a flag and a reader for it.
#[must_use]
pub fn liveness_flag(initial: bool) -> (LivenessFlag, LivenessWatch) {
    let (tx, rx) = watch::channel(initial);
    (LivenessFlag { tx }, LivenessWatch { rx })
}

/// Writer half. Not `Clone`: only the owning task updates the signal.
#[derive(Debug)]
pub struct LivenessFlag {
    tx: watch::Sender<bool>,
}

impl LivenessFlag {
    /// Update the signal. Readers are only woken on an actual change.
    pub fn set(&self, alive: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != alive;
            *current = alive;
            changed
        });
    }

    #[must_use]
    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// New reader for this signal.
    #[must_use]
    pub fn watch(&self) -> LivenessWatch {
        LivenessWatch {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of a liveness signal.
#[derive(Debug, Clone)]
pub struct LivenessWatch {
    rx: watch::Receiver<bool>,
}

impl LivenessWatch {
    #[must_use]
    pub fn get(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the signal equals `alive`.
    ///
    /// Returns `false` if the writer was dropped first.
    pub async fn wait_for(&mut self, alive: bool) -> bool {
        self.rx.wait_for(|current| *current == alive).await.is_ok()
    }
}

/// Point-in-time view of both signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessSnapshot {
    pub reachable: bool,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reader_follows_writer() {
        let (flag, mut watch) = liveness_flag(false);
        assert!(!watch.get());

        let other = flag.watch();
        flag.set(true);
        assert!(watch.get());
        assert!(other.get());
        assert!(watch.wait_for(true).await);
    }

    #[tokio::test]
    async fn test_dropped_writer_ends_wait() {
        let (flag, mut watch) = liveness_flag(false);
        drop(flag);
        assert!(!watch.wait_for(true).await);
    }
}
