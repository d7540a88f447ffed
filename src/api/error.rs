//! The error type propagated out of the transport adapter.

use thiserror::Error;

use super::failure::{classify, ClassifiedFailure, RawFailure};

/// A transport/API error, always carrying its classified form.
///
/// The classifier runs exactly once, at the point of failure; everything
/// downstream (rollback, notifications, logout) consumes `classified`.
#[derive(Debug, Error)]
#[error("{}", .classified.message)]
pub struct ApiError {
  /// The failure as it arrived from the transport.
  pub raw: RawFailure,
  /// The normalized, severity-tagged description.
  pub classified: ClassifiedFailure,
  /// Set when this is a 401 that arrived while a logout was already
  /// underway; consumers skip the duplicate toast and logout.
  pub suppressed: bool,
}

impl ApiError {
  /// Classify `raw` under `context` with no logout side effects.
  pub fn from_raw(raw: RawFailure, context: &str) -> Self {
    let classified = classify(&raw, context, None);
    Self {
      raw,
      classified,
      suppressed: false,
    }
  }
}
