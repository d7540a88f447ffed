//! Cache entries: one per (entity type, scope key).

use crate::api::failure::ClassifiedFailure;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
  /// Never fetched, or invalidated and awaiting a refetch.
  Idle,
  /// A fetch is in flight.
  Fetching,
  /// The last fetch or mutation settled; `items` is last-known-good.
  Settled,
  /// A mutation is in flight and `items` holds its optimistic edit.
  MutationInFlight,
}

/// The cached collection for one scope key.
///
/// The synchronizer is the sole writer; readers only ever observe
/// committed states, never a half-written list.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub items: Vec<T>,
  pub state: EntryState,
  /// The classified failure from the most recent settle, if it failed.
  pub error: Option<ClassifiedFailure>,
  /// Bumped to cancel an in-flight fetch: a fetch only writes its result
  /// back if the generation it started under is still current.
  pub generation: u64,
  /// Set when a successful mutation left provisional data behind; the next
  /// load replaces it with the server's authoritative records.
  pub stale: bool,
}

impl<T> CacheEntry<T> {
  pub fn new() -> Self {
    Self {
      items: Vec::new(),
      state: EntryState::Idle,
      error: None,
      generation: 0,
      stale: false,
    }
  }
}

impl<T> Default for CacheEntry<T> {
  fn default() -> Self {
    Self::new()
  }
}
