//! Global notification store.
//!
//! Holds the list of active failure notifications with severity-based
//! auto-expiry, presents toast-style notifications through an observer
//! interface decoupled from any rendering mechanism, and tracks the
//! process-wide online/offline status.
//!
//! The store must be created inside a Tokio runtime: expiry timers and the
//! network-status subscription run as spawned tasks. Every timer is
//! individually tracked and aborted on removal, `clear_all_errors` or
//! teardown, and the network subscription is aborted at teardown, so no
//! orphaned task ever fires against already-cleared state.

pub mod network;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

use crate::api::failure::{ClassifiedFailure, Severity};

pub use network::NetworkMonitor;

/// Fixed message presented for network failures while offline. The offline
/// state is more actionable for the user than the failing request's own
/// message.
pub const OFFLINE_MESSAGE: &str =
  "You appear to be offline. Please check your internet connection.";

const SUCCESS_DURATION: Duration = Duration::from_millis(3000);
const INFO_DURATION: Duration = Duration::from_millis(4000);

/// Display/expiry duration derived from severity.
///
/// Total over all inputs: notifications without a severity get the medium
/// default.
pub fn expiry_for(severity: Option<Severity>) -> Duration {
  match severity {
    Some(Severity::Low) => Duration::from_millis(3000),
    Some(Severity::Medium) => Duration::from_millis(5000),
    Some(Severity::High) => Duration::from_millis(8000),
    Some(Severity::Critical) => Duration::from_millis(10_000),
    None => Duration::from_millis(5000),
  }
}

/// One entry in the global error list.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
  pub id: u64,
  pub timestamp: DateTime<Utc>,
  pub message: String,
  pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastKind {
  Error(Severity),
  Success,
  Info,
}

/// A transient notification handed to observers.
#[derive(Debug, Clone)]
pub struct Toast {
  pub message: String,
  pub kind: ToastKind,
  pub duration: Duration,
}

/// Per-toast presentation overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToastOptions {
  pub duration: Option<Duration>,
}

type ToastObserver = Arc<dyn Fn(&Toast) + Send + Sync>;

struct Inner {
  errors: Vec<NotificationRecord>,
  timers: HashMap<u64, AbortHandle>,
  observers: Vec<ToastObserver>,
  next_id: u64,
  online: bool,
  listener: Option<AbortHandle>,
}

impl Drop for Inner {
  fn drop(&mut self) {
    for (_, timer) in self.timers.drain() {
      timer.abort();
    }
    if let Some(listener) = self.listener.take() {
      listener.abort();
    }
  }
}

/// The notification store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Notifier {
  inner: Arc<Mutex<Inner>>,
}

impl Notifier {
  /// Create a store subscribed to `monitor` for its whole lifetime.
  pub fn new(monitor: &NetworkMonitor) -> Self {
    let inner = Arc::new(Mutex::new(Inner {
      errors: Vec::new(),
      timers: HashMap::new(),
      observers: Vec::new(),
      next_id: 1,
      online: monitor.is_online(),
      listener: None,
    }));

    let weak = Arc::downgrade(&inner);
    let mut rx = monitor.subscribe();
    let listener = tokio::spawn(async move {
      while rx.changed().await.is_ok() {
        let online = *rx.borrow_and_update();
        let Some(inner) = weak.upgrade() else {
          break;
        };
        inner.lock().unwrap_or_else(|e| e.into_inner()).online = online;
      }
    });
    inner
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .listener = Some(listener.abort_handle());

    Self { inner }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Append an error notification and schedule its automatic removal after
  /// the severity-derived timeout. Returns the new record's id.
  pub fn add_error(&self, message: impl Into<String>, severity: Option<Severity>) -> u64 {
    let mut inner = self.lock();
    let id = inner.next_id;
    inner.next_id += 1;
    inner.errors.push(NotificationRecord {
      id,
      timestamp: Utc::now(),
      message: message.into(),
      severity,
    });

    let weak = Arc::downgrade(&self.inner);
    let delay = expiry_for(severity);
    let timer = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      if let Some(inner) = weak.upgrade() {
        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.errors.retain(|record| record.id != id);
        inner.timers.remove(&id);
      }
    });
    inner.timers.insert(id, timer.abort_handle());
    id
  }

  /// Remove a notification and cancel its expiry timer. Removing an
  /// already-removed or unknown id is a no-op.
  pub fn remove_error(&self, id: u64) {
    let mut inner = self.lock();
    inner.errors.retain(|record| record.id != id);
    if let Some(timer) = inner.timers.remove(&id) {
      timer.abort();
    }
  }

  /// Empty the list and cancel every pending expiry timer.
  pub fn clear_all_errors(&self) {
    let mut inner = self.lock();
    inner.errors.clear();
    for (_, timer) in inner.timers.drain() {
      timer.abort();
    }
  }

  /// Snapshot of the active error notifications.
  pub fn global_errors(&self) -> Vec<NotificationRecord> {
    self.lock().errors.clone()
  }

  pub fn is_online(&self) -> bool {
    self.lock().online
  }

  /// Register a toast observer. Observers are append-only and live for the
  /// store's lifetime.
  pub fn on_toast(&self, observer: impl Fn(&Toast) + Send + Sync + 'static) {
    self.lock().observers.push(Arc::new(observer));
  }

  /// Present a classified failure as a toast.
  ///
  /// When the failure is network-class and the store currently sees the
  /// process as offline, the presented message is overridden with
  /// [`OFFLINE_MESSAGE`]. Duration and styling are keyed by severity using
  /// the same mapping as auto-expiry.
  pub fn show_error_toast(&self, failure: &ClassifiedFailure, options: ToastOptions) {
    let offline = failure.is_network_error && !self.is_online();
    let message = if offline {
      OFFLINE_MESSAGE.to_string()
    } else {
      failure.message.clone()
    };
    let duration = options
      .duration
      .unwrap_or_else(|| expiry_for(Some(failure.severity)));
    self.emit(Toast {
      message,
      kind: ToastKind::Error(failure.severity),
      duration,
    });
  }

  pub fn show_success(&self, message: impl Into<String>, options: ToastOptions) {
    self.emit(Toast {
      message: message.into(),
      kind: ToastKind::Success,
      duration: options.duration.unwrap_or(SUCCESS_DURATION),
    });
  }

  pub fn show_info(&self, message: impl Into<String>, options: ToastOptions) {
    self.emit(Toast {
      message: message.into(),
      kind: ToastKind::Info,
      duration: options.duration.unwrap_or(INFO_DURATION),
    });
  }

  /// Forward a classified failure: record it in the global list and present
  /// it as a toast. Returns the record id.
  pub fn report_failure(&self, failure: &ClassifiedFailure) -> u64 {
    let id = self.add_error(failure.message.clone(), Some(failure.severity));
    self.show_error_toast(failure, ToastOptions::default());
    id
  }

  fn emit(&self, toast: Toast) {
    // Observers run outside the lock so they may call back into the store.
    let observers: Vec<ToastObserver> = self.lock().observers.clone();
    for observer in observers {
      observer(&toast);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::failure::{classify, RawFailure};
  use pretty_assertions::assert_eq;

  fn notifier() -> (Notifier, Arc<Mutex<Vec<Toast>>>) {
    let monitor = NetworkMonitor::new();
    let notifier = Notifier::new(&monitor);
    let toasts = Arc::new(Mutex::new(Vec::new()));
    let sink = toasts.clone();
    notifier.on_toast(move |toast| sink.lock().unwrap().push(toast.clone()));
    (notifier, toasts)
  }

  async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
      if condition() {
        return;
      }
      tokio::task::yield_now().await;
    }
    panic!("condition never became true");
  }

  #[test]
  fn expiry_mapping_is_total() {
    assert_eq!(expiry_for(Some(Severity::Low)), Duration::from_millis(3000));
    assert_eq!(expiry_for(Some(Severity::Medium)), Duration::from_millis(5000));
    assert_eq!(expiry_for(Some(Severity::High)), Duration::from_millis(8000));
    assert_eq!(expiry_for(Some(Severity::Critical)), Duration::from_millis(10_000));
    assert_eq!(expiry_for(None), Duration::from_millis(5000));
  }

  #[tokio::test]
  async fn add_and_remove_errors() {
    let (notifier, _toasts) = notifier();

    let id = notifier.add_error("boom", Some(Severity::Low));
    assert_eq!(notifier.global_errors().len(), 1);
    assert_eq!(notifier.global_errors()[0].message, "boom");
    assert_eq!(notifier.global_errors()[0].severity, Some(Severity::Low));

    notifier.remove_error(id);
    assert!(notifier.global_errors().is_empty());

    // Idempotent: unknown and already-removed ids are no-ops.
    notifier.remove_error(id);
    notifier.remove_error(999);
  }

  #[tokio::test(start_paused = true)]
  async fn errors_expire_after_the_severity_timeout() {
    let (notifier, _toasts) = notifier();

    notifier.add_error("low", Some(Severity::Low));
    notifier.add_error("high", Some(Severity::High));

    // Let the spawned expiry tasks register their sleeps with the paused
    // clock before advancing it.
    tokio::task::yield_now().await;

    tokio::time::advance(Duration::from_millis(3001)).await;
    wait_until(|| notifier.global_errors().len() == 1).await;
    assert_eq!(notifier.global_errors()[0].message, "high");

    tokio::time::advance(Duration::from_millis(5000)).await;
    wait_until(|| notifier.global_errors().is_empty()).await;
  }

  #[tokio::test(start_paused = true)]
  async fn clear_all_cancels_pending_timers() {
    let (notifier, _toasts) = notifier();

    notifier.add_error("a", Some(Severity::Low));
    notifier.add_error("b", None);
    notifier.clear_all_errors();
    assert!(notifier.global_errors().is_empty());
    assert!(notifier.lock().timers.is_empty());

    // Nothing resurfaces after the timers would have fired.
    tokio::time::advance(Duration::from_millis(20_000)).await;
    tokio::task::yield_now().await;
    assert!(notifier.global_errors().is_empty());
  }

  #[tokio::test]
  async fn offline_override_replaces_the_failure_message() {
    let monitor = NetworkMonitor::new();
    let notifier = Notifier::new(&monitor);
    let toasts = Arc::new(Mutex::new(Vec::new()));
    let sink = toasts.clone();
    notifier.on_toast(move |toast| sink.lock().unwrap().push(toast.clone()));

    monitor.set_online(false);
    wait_until(|| !notifier.is_online()).await;

    let mut failure = classify(
      &RawFailure::Network("connection refused".to_string()),
      "saving data",
      None,
    );
    failure.message = "Validation failed".to_string();
    notifier.show_error_toast(&failure, ToastOptions::default());

    let toasts = toasts.lock().unwrap();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, OFFLINE_MESSAGE);
  }

  #[tokio::test]
  async fn online_failures_keep_their_own_message() {
    let (notifier, toasts) = notifier();

    let failure = classify(
      &RawFailure::Network("connection refused".to_string()),
      "saving data",
      None,
    );
    notifier.show_error_toast(&failure, ToastOptions::default());

    let toasts = toasts.lock().unwrap();
    assert_eq!(toasts[0].message, failure.message);
    assert_eq!(toasts[0].kind, ToastKind::Error(Severity::High));
    assert_eq!(toasts[0].duration, Duration::from_millis(8000));
  }

  #[tokio::test]
  async fn success_and_info_have_fixed_presentation() {
    let (notifier, toasts) = notifier();

    notifier.show_success("Task created", ToastOptions::default());
    notifier.show_info("Synced", ToastOptions::default());

    let toasts = toasts.lock().unwrap();
    assert_eq!(toasts[0].kind, ToastKind::Success);
    assert_eq!(toasts[0].duration, SUCCESS_DURATION);
    assert_eq!(toasts[1].kind, ToastKind::Info);
    assert_eq!(toasts[1].duration, INFO_DURATION);
  }

  #[tokio::test]
  async fn report_failure_records_and_toasts_once() {
    let (notifier, toasts) = notifier();

    let failure = classify(
      &RawFailure::Status {
        status: 400,
        message: Some("Title too long".to_string()),
      },
      "creating the task",
      None,
    );
    notifier.report_failure(&failure);

    assert_eq!(notifier.global_errors().len(), 1);
    assert_eq!(notifier.global_errors()[0].message, "Title too long");
    assert_eq!(toasts.lock().unwrap().len(), 1);
  }
}
