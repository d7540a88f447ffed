//! Composition root for the Taskdeck data layer.
//!
//! `TaskdeckClient` owns the whole client-side state: session, transport,
//! network monitor, notification store and the task/project caches. It is
//! created once at application start and torn down at shutdown; nothing in
//! this crate relies on ambient singletons.

use std::sync::Arc;

use color_eyre::Result;
use reqwest::Method;
use serde_json::{json, Value};

use crate::api::client::{AuthFailureHook, RequestConfig};
use crate::api::failure::RawFailure;
use crate::api::{ApiError, HttpTransport, Session};
use crate::config::Config;
use crate::notify::{NetworkMonitor, Notifier, NotificationRecord};
use crate::store::EntityStore;
use crate::types::{Project, Task};

/// The client-side data layer: one instance per running application.
///
/// Must be created inside a Tokio runtime; the notification store runs its
/// expiry timers and network-status subscription as spawned tasks.
pub struct TaskdeckClient {
  session: Arc<Session>,
  transport: Arc<HttpTransport>,
  monitor: NetworkMonitor,
  notifier: Notifier,
  tasks: Arc<EntityStore<Task, HttpTransport>>,
  projects: Arc<EntityStore<Project, HttpTransport>>,
}

impl TaskdeckClient {
  /// Wire up the data layer. The default auth-failure hook drops the
  /// credential, so a 401 terminates the session exactly once; register a
  /// toast observer to react in the UI.
  pub fn new(config: &Config) -> Result<Self> {
    let session = Arc::new(Session::new());
    let monitor = NetworkMonitor::new();
    let notifier = Notifier::new(&monitor);

    let hook: AuthFailureHook = {
      let session = session.clone();
      Arc::new(move || session.clear_token())
    };
    let transport =
      Arc::new(HttpTransport::new(config, session.clone())?.with_auth_failure_hook(hook));

    let tasks = Arc::new(EntityStore::new(transport.clone(), notifier.clone()));
    let projects = Arc::new(EntityStore::new(transport.clone(), notifier.clone()));

    Ok(Self {
      session,
      transport,
      monitor,
      notifier,
      tasks,
      projects,
    })
  }

  /// The task cache; scope keys are project ids.
  pub fn tasks(&self) -> &Arc<EntityStore<Task, HttpTransport>> {
    &self.tasks
  }

  /// The project cache; use [`crate::types::ALL_PROJECTS`] as the scope.
  pub fn projects(&self) -> &Arc<EntityStore<Project, HttpTransport>> {
    &self.projects
  }

  pub fn notifier(&self) -> &Notifier {
    &self.notifier
  }

  /// The connectivity signal; flip it from whatever probe the embedding
  /// application has.
  pub fn network(&self) -> &NetworkMonitor {
    &self.monitor
  }

  pub fn is_online(&self) -> bool {
    self.notifier.is_online()
  }

  pub fn global_errors(&self) -> Vec<NotificationRecord> {
    self.notifier.global_errors()
  }

  pub fn is_authenticated(&self) -> bool {
    self.session.has_token()
  }

  pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
    self
      .authenticate(
        "/auth/login",
        json!({ "email": email, "password": password }),
        "logging in",
      )
      .await
  }

  pub async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
    self
      .authenticate(
        "/auth/register",
        json!({ "email": email, "password": password }),
        "creating your account",
      )
      .await
  }

  /// Explicit user-initiated logout.
  pub fn logout(&self) {
    self.session.clear_token();
  }

  async fn authenticate(&self, path: &str, body: Value, context: &str) -> Result<(), ApiError> {
    let response = self
      .transport
      .request_with(
        Method::POST,
        path,
        Some(body),
        context,
        RequestConfig {
          unauthenticated: true,
        },
      )
      .await?;

    let token = extract_token(&response).ok_or_else(|| {
      ApiError::from_raw(
        RawFailure::Other("authentication response did not include a token".to_string()),
        context,
      )
    })?;

    // Storing the token also resets the logout latch, exactly once per
    // successful re-authentication.
    self.session.set_token(token);
    Ok(())
  }
}

fn extract_token(response: &Value) -> Option<String> {
  response
    .get("token")
    .or_else(|| response.get("access_token"))
    .and_then(Value::as_str)
    .map(String::from)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn extracts_token_from_either_key() {
    assert_eq!(
      extract_token(&json!({ "token": "abc" })),
      Some("abc".to_string())
    );
    assert_eq!(
      extract_token(&json!({ "access_token": "def" })),
      Some("def".to_string())
    );
    assert_eq!(extract_token(&json!({ "user": {} })), None);
  }
}
