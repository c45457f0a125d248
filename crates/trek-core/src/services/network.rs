//! Connectivity state shared between front ends and managers.

use tokio::sync::watch;

/// Publishes connectivity changes to every subscribed manager.
#[derive(Debug)]
pub struct NetworkStatus {
    sender: watch::Sender<bool>,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender }
    }

    /// Record a connectivity change; unchanged values do not notify.
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(
                "Network status changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// A live view of the status, sampled by managers at call start.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
