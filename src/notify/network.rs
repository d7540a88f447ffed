//! Process-wide online/offline signal.

use std::sync::Arc;

use tokio::sync::watch;

/// The connectivity signal consumers subscribe to.
///
/// Stands in for the platform's online/offline events: whatever
/// connectivity probe the application has flips the flag with
/// [`NetworkMonitor::set_online`], and subscribers observe the change.
/// Starts online.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
  tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(true);
    Self { tx: Arc::new(tx) }
  }

  pub fn set_online(&self, online: bool) {
    self.tx.send_replace(online);
  }

  pub fn is_online(&self) -> bool {
    *self.tx.borrow()
  }

  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }
}

impl Default for NetworkMonitor {
  fn default() -> Self {
    Self::new()
  }
}
