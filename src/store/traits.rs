//! The resource seam between the synchronizer and concrete entity types.

use serde::{de::DeserializeOwned, Serialize};

/// An entity the synchronizer can cache and mutate.
///
/// Implementors describe where their collections live on the wire and how
/// they are named in response envelopes and user-facing messages.
pub trait Resource:
  Clone + Send + Sync + Serialize + DeserializeOwned + PartialEq + 'static
{
  /// Unique identifier. Optimistic placeholders carry a locally generated
  /// id until the server's authoritative record replaces them.
  fn id(&self) -> &str;

  /// Wire name used by list envelopes (e.g. "tasks").
  fn collection_name() -> &'static str;

  /// Wire name used by single-entity envelopes (e.g. "task").
  fn entity_name() -> &'static str;

  /// Lowercase label used in operation contexts ("creating the task").
  fn label() -> &'static str;

  /// Capitalized label used in success toasts ("Task created").
  fn display_name() -> &'static str;

  /// Endpoint for the collection under a scope key.
  fn collection_path(scope: &str) -> String;

  /// Endpoint for a single entity.
  fn entity_path(id: &str) -> String;

  /// Whether this entity is a not-yet-confirmed optimistic placeholder.
  fn is_pending(&self) -> bool;
}
