//! Entity cache and mutation synchronizer.
//!
//! Holds the client's copy of each collection keyed by scope, and executes
//! create/update/patch/delete against the transport while applying
//! optimistic local edits. Every mutation follows the same three-phase
//! protocol:
//!
//! 1. cancel any in-flight fetch for the scope, snapshot the current list
//!    and synchronously apply the optimistic edit,
//! 2. send the request with an operation-specific context,
//! 3. settle: on success discard the snapshot and invalidate the scope so
//!    the next load replaces provisional data with the server's
//!    authoritative records; on failure restore the snapshot exactly,
//!    notify, and re-throw.
//!
//! Mutations against the same scope key are serialized through a per-scope
//! async mutex, so a mutation's snapshot can never capture another
//! mutation's unconfirmed optimistic state. Fetch cancellation is advisory:
//! it suppresses the fetch's eventual cache-write, not the request itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::client::Transport;
use crate::api::envelope;
use crate::api::error::ApiError;
use crate::api::failure::{ClassifiedFailure, RawFailure};
use crate::notify::{Notifier, ToastOptions};

use super::entry::{CacheEntry, EntryState};
use super::traits::Resource;

/// Cache and synchronizer for one entity type. The store is the sole
/// writer of its cache entries.
pub struct EntityStore<T: Resource, C: Transport> {
  transport: Arc<C>,
  notifier: Notifier,
  entries: Mutex<HashMap<String, CacheEntry<T>>>,
  mutation_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
  placeholder_seq: AtomicU64,
}

impl<T: Resource, C: Transport> EntityStore<T, C> {
  pub fn new(transport: Arc<C>, notifier: Notifier) -> Self {
    Self {
      transport,
      notifier,
      entries: Mutex::new(HashMap::new()),
      mutation_locks: Mutex::new(HashMap::new()),
      placeholder_seq: AtomicU64::new(1),
    }
  }

  fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Snapshot of the cached list for a scope.
  pub fn items(&self, scope: &str) -> Vec<T> {
    self
      .lock_entries()
      .get(scope)
      .map(|entry| entry.items.clone())
      .unwrap_or_default()
  }

  pub fn entry_state(&self, scope: &str) -> EntryState {
    self
      .lock_entries()
      .get(scope)
      .map(|entry| entry.state)
      .unwrap_or(EntryState::Idle)
  }

  /// The classified failure from the most recent settle for a scope.
  pub fn last_error(&self, scope: &str) -> Option<ClassifiedFailure> {
    self
      .lock_entries()
      .get(scope)
      .and_then(|entry| entry.error.clone())
  }

  /// Whether the scope holds provisional data awaiting a refetch.
  pub fn is_stale(&self, scope: &str) -> bool {
    self
      .lock_entries()
      .get(scope)
      .map(|entry| entry.stale)
      .unwrap_or(false)
  }

  /// Mark a scope for resynchronization without touching its items.
  pub fn invalidate(&self, scope: &str) {
    let mut entries = self.lock_entries();
    let entry = entries.entry(scope.to_string()).or_default();
    entry.stale = true;
  }

  /// Fetch the authoritative collection for a scope and replace the cache
  /// entry wholesale. On failure the entry is marked with the error and the
  /// previous list is preserved, so a transient fetch failure never blanks
  /// a previously populated view.
  pub async fn load(&self, scope: &str) -> Result<Vec<T>, ApiError> {
    let generation = {
      let mut entries = self.lock_entries();
      let entry = entries.entry(scope.to_string()).or_default();
      entry.generation += 1;
      entry.state = EntryState::Fetching;
      entry.generation
    };

    let context = format!("loading {}", T::collection_name());
    let result = self
      .transport
      .request(Method::GET, &T::collection_path(scope), None, &context)
      .await
      .and_then(|value| {
        envelope::collection::<T>(value, T::collection_name())
          .map_err(|e| decode_error(e, &context))
      });

    match result {
      Ok(items) => {
        let mut entries = self.lock_entries();
        let entry = entries.entry(scope.to_string()).or_default();
        if entry.generation != generation {
          // Superseded by a mutation or a newer load; the write-back is
          // suppressed and the current cache content stands.
          debug!(scope, "discarding result of cancelled fetch");
          return Ok(entry.items.clone());
        }
        entry.items = items.clone();
        entry.state = EntryState::Settled;
        entry.error = None;
        entry.stale = false;
        Ok(items)
      }
      Err(error) => {
        {
          let mut entries = self.lock_entries();
          let entry = entries.entry(scope.to_string()).or_default();
          if entry.generation == generation {
            entry.state = EntryState::Settled;
            entry.error = Some(error.classified.clone());
          }
        }
        if !error.suppressed {
          self.notifier.report_failure(&error.classified);
        }
        Err(error)
      }
    }
  }

  /// Optimistically append a provisional entity, then create it on the
  /// server. The provisional entity carries a locally generated placeholder
  /// id and a pending marker; a subsequent load replaces it with the
  /// server's authoritative record.
  pub async fn create(&self, scope: &str, payload: Value) -> Result<T, ApiError> {
    let _guard = self.scope_lock(scope).await;
    let context = format!("creating the {}", T::label());

    let placeholder = self.placeholder(&payload, &context)?;
    let snapshot = self.begin_mutation(scope, |items| items.push(placeholder));

    let result = self
      .transport
      .request(Method::POST, &T::collection_path(scope), Some(payload), &context)
      .await;
    match self.decode_entity(result, &context) {
      Ok(created) => {
        self.settle_success(scope);
        self
          .notifier
          .show_success(format!("{} created", T::display_name()), ToastOptions::default());
        Ok(created)
      }
      Err(error) => {
        self.settle_failure(scope, snapshot, &error);
        Err(error)
      }
    }
  }

  /// Optimistically merge `payload` into the cached entity, then update it
  /// on the server.
  pub async fn update(&self, scope: &str, id: &str, payload: Value) -> Result<T, ApiError> {
    let _guard = self.scope_lock(scope).await;
    let context = format!("updating the {}", T::label());

    let snapshot = self.begin_mutation(scope, |items| merge_into(items, id, &payload));

    let result = self
      .transport
      .request(Method::PUT, &T::entity_path(id), Some(payload), &context)
      .await;
    match self.decode_entity(result, &context) {
      Ok(updated) => {
        self.settle_success(scope);
        self
          .notifier
          .show_success(format!("{} updated", T::display_name()), ToastOptions::default());
        Ok(updated)
      }
      Err(error) => {
        self.settle_failure(scope, snapshot, &error);
        Err(error)
      }
    }
  }

  /// Lightweight field patch: same protocol as [`EntityStore::update`] but
  /// intentionally without a success toast. Patches are used for frequent,
  /// low-ceremony edits like marking a task complete, where a toast per
  /// action is undesirable.
  pub async fn patch(&self, scope: &str, id: &str, payload: Value) -> Result<T, ApiError> {
    let _guard = self.scope_lock(scope).await;
    let context = format!("updating {} field", T::label());

    let snapshot = self.begin_mutation(scope, |items| merge_into(items, id, &payload));

    let result = self
      .transport
      .request(Method::PATCH, &T::entity_path(id), Some(payload), &context)
      .await;
    match self.decode_entity(result, &context) {
      Ok(patched) => {
        self.settle_success(scope);
        Ok(patched)
      }
      Err(error) => {
        self.settle_failure(scope, snapshot, &error);
        Err(error)
      }
    }
  }

  /// Optimistically remove the entity, then delete it on the server.
  pub async fn delete(&self, scope: &str, id: &str) -> Result<(), ApiError> {
    let _guard = self.scope_lock(scope).await;
    let context = format!("deleting the {}", T::label());

    let snapshot = self.begin_mutation(scope, |items| items.retain(|item| item.id() != id));

    match self
      .transport
      .request(Method::DELETE, &T::entity_path(id), None, &context)
      .await
    {
      Ok(_) => {
        self.settle_success(scope);
        self
          .notifier
          .show_success(format!("{} deleted", T::display_name()), ToastOptions::default());
        Ok(())
      }
      Err(error) => {
        self.settle_failure(scope, snapshot, &error);
        Err(error)
      }
    }
  }

  /// Serialize mutations per scope key.
  async fn scope_lock(&self, scope: &str) -> tokio::sync::OwnedMutexGuard<()> {
    let lock = {
      let mut locks = self.mutation_locks.lock().unwrap_or_else(|e| e.into_inner());
      locks
        .entry(scope.to_string())
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
    };
    lock.lock_owned().await
  }

  /// Phase one of a mutation: cancel any in-flight fetch for the scope by
  /// bumping its generation, snapshot the current list, and apply the
  /// optimistic edit. All of it happens under the entries lock, so the
  /// cancellation is ordered strictly before the edit it protects.
  fn begin_mutation(&self, scope: &str, edit: impl FnOnce(&mut Vec<T>)) -> Vec<T> {
    let mut entries = self.lock_entries();
    let entry = entries.entry(scope.to_string()).or_default();
    entry.generation += 1;
    let snapshot = entry.items.clone();
    edit(&mut entry.items);
    entry.state = EntryState::MutationInFlight;
    entry.error = None;
    snapshot
  }

  fn settle_success(&self, scope: &str) {
    let mut entries = self.lock_entries();
    let entry = entries.entry(scope.to_string()).or_default();
    entry.state = EntryState::Settled;
    entry.error = None;
    // Provisional data stays visible as last-known-good; the next load
    // replaces it with the server's authoritative records.
    entry.stale = true;
  }

  fn settle_failure(&self, scope: &str, snapshot: Vec<T>, error: &ApiError) {
    {
      let mut entries = self.lock_entries();
      let entry = entries.entry(scope.to_string()).or_default();
      entry.items = snapshot;
      entry.state = EntryState::Settled;
      entry.error = Some(error.classified.clone());
    }
    debug!(scope, error = %error.classified.message, "mutation rolled back");
    if !error.suppressed {
      self.notifier.report_failure(&error.classified);
    }
  }

  /// Build the provisional entity for an optimistic create.
  fn placeholder(&self, payload: &Value, context: &str) -> Result<T, ApiError> {
    let seq = self.placeholder_seq.fetch_add(1, Ordering::Relaxed);
    let mut fields = match payload {
      Value::Object(map) => map.clone(),
      _ => Map::new(),
    };
    fields.insert("id".to_string(), Value::String(format!("local-{seq}")));
    fields.insert("pending".to_string(), Value::Bool(true));
    serde_json::from_value(Value::Object(fields)).map_err(|e| decode_error(e, context))
  }

  fn decode_entity(
    &self,
    result: Result<Value, ApiError>,
    context: &str,
  ) -> Result<T, ApiError> {
    let value = result?;
    envelope::entity(value, T::entity_name()).map_err(|e| decode_error(e, context))
  }
}

fn decode_error(error: serde_json::Error, context: &str) -> ApiError {
  ApiError::from_raw(
    RawFailure::Other(format!("failed to decode server response: {error}")),
    context,
  )
}

/// Merge the fields of a JSON object into the cached entity with the given
/// id. Best effort: an entity that fails to round-trip is left untouched
/// and the server's settle decides the outcome.
fn merge_into<T: Resource>(items: &mut [T], id: &str, payload: &Value) {
  for item in items.iter_mut() {
    if item.id() == id {
      if let Some(merged) = merge_entity(item, payload) {
        *item = merged;
      }
      return;
    }
  }
}

fn merge_entity<T: Resource>(item: &T, payload: &Value) -> Option<T> {
  let mut value = serde_json::to_value(item).ok()?;
  if let (Value::Object(base), Value::Object(fields)) = (&mut value, payload) {
    for (key, field) in fields {
      base.insert(key.clone(), field.clone());
    }
  }
  serde_json::from_value(value).ok()
}
