//! HTTP transport adapter.
//!
//! Issues requests against the Taskdeck API, attaches the bearer credential
//! when one is held, stamps every request with a human-readable operation
//! context, and routes failures through the classifier before propagation.

use std::future::Future;
use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::config::Config;

use super::envelope;
use super::error::ApiError;
use super::failure::{classify, RawFailure, DEFAULT_CONTEXT};
use super::session::Session;

/// Callback invoked when an authentication failure terminates the session.
pub type AuthFailureHook = Arc<dyn Fn() + Send + Sync>;

/// Per-request overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestConfig {
  /// Skip the bearer header even when a token is held (auth endpoints).
  pub unauthenticated: bool,
}

/// The seam between the synchronizer and the network.
pub trait Transport: Send + Sync {
  /// Issue a request and return the decoded JSON body (`Value::Null` for
  /// empty responses). Failures arrive pre-classified inside [`ApiError`].
  fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
    context: &str,
  ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// Default operation context for a verb, used when the caller supplies none.
pub fn default_context(method: &Method) -> &'static str {
  match *method {
    Method::GET => "fetching data",
    Method::POST => "creating data",
    Method::PUT | Method::PATCH => "updating data",
    Method::DELETE => "deleting data",
    _ => DEFAULT_CONTEXT,
  }
}

/// Classify a raw failure, applying the logout de-duplication latch.
///
/// Only the first authentication failure per session termination claims the
/// latch and fires `on_auth_failure`; concurrent 401s come back marked
/// suppressed so N failing requests never produce N logouts or N toasts.
pub(crate) fn classify_failure(
  session: &Session,
  on_auth_failure: Option<&AuthFailureHook>,
  raw: RawFailure,
  context: &str,
) -> ApiError {
  let mut suppressed = false;
  let mut hook: Option<&(dyn Fn() + Send + Sync)> = None;
  if raw.is_auth_failure() {
    if session.begin_logout() {
      hook = on_auth_failure.map(|h| h.as_ref());
    } else {
      suppressed = true;
    }
  }
  let classified = classify(&raw, context, hook);
  ApiError {
    raw,
    classified,
    suppressed,
  }
}

/// Transport adapter backed by reqwest.
#[derive(Clone)]
pub struct HttpTransport {
  http: reqwest::Client,
  base_url: String,
  session: Arc<Session>,
  on_auth_failure: Option<AuthFailureHook>,
  diagnostics: bool,
}

impl HttpTransport {
  /// Build a transport from configuration. The request timeout configured
  /// here is the fixed upper bound on request duration; exceeding it is
  /// classified as a network failure.
  pub fn new(config: &Config, session: Arc<Session>) -> Result<Self> {
    let base_url = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: base_url.as_str().trim_end_matches('/').to_string(),
      session,
      on_auth_failure: None,
      diagnostics: config.diagnostics.enabled,
    })
  }

  /// Register the session-termination hook fired on the first 401.
  pub fn with_auth_failure_hook(mut self, hook: AuthFailureHook) -> Self {
    self.on_auth_failure = Some(hook);
    self
  }

  pub fn session(&self) -> &Arc<Session> {
    &self.session
  }

  /// Issue a request with per-request overrides.
  pub async fn request_with(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
    context: &str,
    config: RequestConfig,
  ) -> Result<Value, ApiError> {
    let context = if context.is_empty() {
      default_context(&method)
    } else {
      context
    };
    let url = format!("{}{}", self.base_url, path);

    let mut request = self.http.request(method, url);
    if !config.unauthenticated {
      if let Some(token) = self.session.token() {
        request = request.bearer_auth(token);
      }
    }
    if let Some(body) = body {
      request = request.json(&body);
    }

    let response = match request.send().await {
      Ok(response) => response,
      Err(e) => {
        // No response at all: connection refused, DNS, timeout.
        return Err(self.fail(RawFailure::Network(e.to_string()), context));
      }
    };

    let status = response.status();
    if !status.is_success() {
      let message = response
        .text()
        .await
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(&text).ok())
        .as_ref()
        .and_then(envelope::error_message);
      return Err(self.fail(
        RawFailure::Status {
          status: status.as_u16(),
          message,
        },
        context,
      ));
    }

    if status == StatusCode::NO_CONTENT {
      return Ok(Value::Null);
    }

    let text = response
      .text()
      .await
      .map_err(|e| self.fail(RawFailure::Network(e.to_string()), context))?;
    if text.trim().is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_str(&text)
      .map_err(|e| self.fail(RawFailure::Other(format!("invalid response body: {e}")), context))
  }

  fn fail(&self, raw: RawFailure, context: &str) -> ApiError {
    let error = classify_failure(&self.session, self.on_auth_failure.as_ref(), raw, context);
    if self.diagnostics {
      tracing::debug!(
        target: "taskdeck::diagnostics",
        context,
        severity = ?error.classified.severity,
        suppressed = error.suppressed,
        error = %error.classified.message,
        "request failed"
      );
    }
    error
  }
}

impl Transport for HttpTransport {
  async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
    context: &str,
  ) -> Result<Value, ApiError> {
    self
      .request_with(method, path, body, context, RequestConfig::default())
      .await
  }
}
