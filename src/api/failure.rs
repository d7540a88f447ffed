//! Failure classification.
//!
//! Every transport/API failure is normalized into a [`ClassifiedFailure`]:
//! a severity-tagged, user-presentable description that downstream code
//! (the notification store and the mutation synchronizer) can act on
//! without inspecting the raw error.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fallback operation context when the caller supplied none.
pub const DEFAULT_CONTEXT: &str = "performing this action";

const MSG_NETWORK: &str =
  "Unable to connect to the server. Please check your internet connection and try again.";
const MSG_AUTH: &str = "Authentication failed. Please log in to continue.";
const MSG_SERVER: &str =
  "The server is currently experiencing issues. Please try again in a few moments.";

/// Severity tiers for classified failures.
///
/// The classifier itself never produces `Critical`; it is available for
/// manually raised notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

/// A transport/API failure before classification.
#[derive(Debug, Clone, Error)]
pub enum RawFailure {
  /// No response was received at all (connection refused, DNS failure,
  /// request timeout).
  #[error("network error: {0}")]
  Network(String),
  /// The server responded with a non-success status.
  #[error("status {status}")]
  Status { status: u16, message: Option<String> },
  /// Anything else: response decoding failures, malformed URLs, etc.
  #[error("{0}")]
  Other(String),
}

impl RawFailure {
  /// Whether this failure must trigger the session-logout path.
  ///
  /// Status takes precedence over body-absence heuristics: a 401 with no
  /// body is an authentication failure, never a network failure.
  pub fn is_auth_failure(&self) -> bool {
    matches!(self, RawFailure::Status { status: 401, .. })
  }
}

/// The normalized description of a transport/API failure.
///
/// Produced once per failure, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFailure {
  pub message: String,
  pub severity: Severity,
  pub is_network_error: bool,
  pub is_server_error: bool,
  pub is_client_error: bool,
  pub should_logout: bool,
  /// The classification instant.
  pub timestamp: DateTime<Utc>,
}

impl ClassifiedFailure {
  fn base(message: String, severity: Severity) -> Self {
    Self {
      message,
      severity,
      is_network_error: false,
      is_server_error: false,
      is_client_error: false,
      should_logout: false,
      timestamp: Utc::now(),
    }
  }
}

/// Classify a raw failure under an operation context.
///
/// Never fails. Classification order, first match wins:
///
/// 1. network error (no response at all)
/// 2. authentication error (status 401) - invokes `on_auth_failure`
/// 3. server error (5xx)
/// 4. client error (4xx excluding 401)
/// 5. unclassified
///
/// An empty `context` falls back to [`DEFAULT_CONTEXT`].
pub fn classify(
  raw: &RawFailure,
  context: &str,
  on_auth_failure: Option<&(dyn Fn() + Send + Sync)>,
) -> ClassifiedFailure {
  let context = if context.is_empty() {
    DEFAULT_CONTEXT
  } else {
    context
  };

  match raw {
    RawFailure::Network(_) => {
      let mut failure = ClassifiedFailure::base(MSG_NETWORK.to_string(), Severity::High);
      failure.is_network_error = true;
      failure
    }
    RawFailure::Status { status: 401, message } => {
      if let Some(callback) = on_auth_failure {
        callback();
      }
      let message = message.clone().unwrap_or_else(|| MSG_AUTH.to_string());
      let mut failure = ClassifiedFailure::base(message, Severity::Medium);
      failure.should_logout = true;
      failure
    }
    RawFailure::Status { status, .. } if (500..=599).contains(status) => {
      let mut failure = ClassifiedFailure::base(MSG_SERVER.to_string(), Severity::High);
      failure.is_server_error = true;
      failure
    }
    RawFailure::Status { status, message } if (400..=499).contains(status) => {
      let message = message.clone().unwrap_or_else(|| {
        format!("There was an issue with your request while {context}. Please check your input and try again.")
      });
      let mut failure = ClassifiedFailure::base(message, Severity::Low);
      failure.is_client_error = true;
      failure
    }
    RawFailure::Status { message, .. } => unclassified(message.clone(), context),
    RawFailure::Other(_) => unclassified(None, context),
  }
}

fn unclassified(message: Option<String>, context: &str) -> ClassifiedFailure {
  let message = message.unwrap_or_else(|| {
    format!("An unexpected error occurred while {context}. Please try again.")
  });
  ClassifiedFailure::base(message, Severity::Medium)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn network_failure_is_high_severity() {
    let raw = RawFailure::Network("connection refused".to_string());
    let failure = classify(&raw, "fetching data", None);

    assert_eq!(failure.severity, Severity::High);
    assert!(failure.is_network_error);
    assert!(!failure.is_server_error);
    assert!(!failure.should_logout);
    assert_eq!(failure.message, MSG_NETWORK);
  }

  #[test]
  fn auth_failure_takes_precedence_over_missing_body() {
    // A 401 with no body is an auth error, not a network error.
    let raw = RawFailure::Status {
      status: 401,
      message: None,
    };
    let failure = classify(&raw, "fetching data", None);

    assert!(failure.should_logout);
    assert!(!failure.is_network_error);
    assert_eq!(failure.severity, Severity::Medium);
    assert_eq!(failure.message, MSG_AUTH);
  }

  #[test]
  fn auth_failure_prefers_server_message_and_invokes_callback() {
    let invoked = AtomicUsize::new(0);
    let raw = RawFailure::Status {
      status: 401,
      message: Some("Token expired".to_string()),
    };
    let failure = classify(&raw, "fetching data", Some(&|| {
      invoked.fetch_add(1, Ordering::SeqCst);
    }));

    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert_eq!(failure.message, "Token expired");
  }

  #[test]
  fn callback_not_invoked_for_non_auth_failures() {
    let invoked = AtomicUsize::new(0);
    let raw = RawFailure::Status {
      status: 500,
      message: None,
    };
    classify(&raw, "fetching data", Some(&|| {
      invoked.fetch_add(1, Ordering::SeqCst);
    }));

    assert_eq!(invoked.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn server_errors_use_fixed_message() {
    for status in [500, 503, 599] {
      let raw = RawFailure::Status {
        status,
        message: Some("stack trace".to_string()),
      };
      let failure = classify(&raw, "creating data", None);

      assert_eq!(failure.severity, Severity::High);
      assert!(failure.is_server_error);
      assert_eq!(failure.message, MSG_SERVER);
    }
  }

  #[test]
  fn client_errors_prefer_server_message() {
    let raw = RawFailure::Status {
      status: 400,
      message: Some("Title too long".to_string()),
    };
    let failure = classify(&raw, "creating the task", None);

    assert_eq!(failure.severity, Severity::Low);
    assert!(failure.is_client_error);
    assert_eq!(failure.message, "Title too long");
  }

  #[test]
  fn client_errors_fall_back_to_contextual_message() {
    let raw = RawFailure::Status {
      status: 422,
      message: None,
    };
    let failure = classify(&raw, "creating the task", None);

    assert_eq!(
      failure.message,
      "There was an issue with your request while creating the task. Please check your input and try again."
    );
  }

  #[test]
  fn unclassified_uses_default_context() {
    let raw = RawFailure::Other("something odd".to_string());
    let failure = classify(&raw, "", None);

    assert_eq!(failure.severity, Severity::Medium);
    assert_eq!(
      failure.message,
      "An unexpected error occurred while performing this action. Please try again."
    );
  }

  #[test]
  fn out_of_range_status_is_unclassified() {
    let raw = RawFailure::Status {
      status: 302,
      message: Some("Found".to_string()),
    };
    let failure = classify(&raw, "fetching data", None);

    assert_eq!(failure.severity, Severity::Medium);
    assert!(!failure.is_client_error);
    assert!(!failure.is_server_error);
    assert_eq!(failure.message, "Found");
  }
}
