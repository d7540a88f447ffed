//! Wire-envelope handling for Taskdeck API responses.
//!
//! The API is inconsistent about envelopes: list endpoints return either
//! `{ "<name>": [...] }` or a bare array, and single-entity endpoints
//! return either `{ "<name>": {...} }` or the bare entity. Callers must
//! accept both shapes.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a collection response, unwrapping `{ "<name>": [...] }` if the
/// envelope is present.
pub fn collection<T: DeserializeOwned>(value: Value, name: &str) -> Result<Vec<T>, serde_json::Error> {
  serde_json::from_value(unwrap(value, name))
}

/// Decode a single-entity response, unwrapping `{ "<name>": {...} }` if the
/// envelope is present.
pub fn entity<T: DeserializeOwned>(value: Value, name: &str) -> Result<T, serde_json::Error> {
  serde_json::from_value(unwrap(value, name))
}

fn unwrap(value: Value, name: &str) -> Value {
  match value {
    Value::Object(mut map) => match map.remove(name) {
      Some(inner) => inner,
      None => Value::Object(map),
    },
    other => other,
  }
}

/// Extract a server-supplied error message from a failure body, if any.
pub fn error_message(body: &Value) -> Option<String> {
  body
    .get("message")
    .or_else(|| body.get("error"))
    .and_then(Value::as_str)
    .map(String::from)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Debug, PartialEq, serde::Deserialize)]
  struct Item {
    id: String,
  }

  #[test]
  fn collection_accepts_enveloped_and_bare_arrays() {
    let enveloped = json!({ "tasks": [{ "id": "t1" }] });
    let bare = json!([{ "id": "t1" }]);

    let a: Vec<Item> = collection(enveloped, "tasks").unwrap();
    let b: Vec<Item> = collection(bare, "tasks").unwrap();

    assert_eq!(a, b);
    assert_eq!(a[0].id, "t1");
  }

  #[test]
  fn entity_accepts_enveloped_and_bare_objects() {
    let enveloped = json!({ "task": { "id": "t1" } });
    let bare = json!({ "id": "t1" });

    let a: Item = entity(enveloped, "task").unwrap();
    let b: Item = entity(bare, "task").unwrap();

    assert_eq!(a, b);
  }

  #[test]
  fn error_message_checks_both_keys() {
    assert_eq!(
      error_message(&json!({ "message": "Title too long" })),
      Some("Title too long".to_string())
    );
    assert_eq!(
      error_message(&json!({ "error": "Bad request" })),
      Some("Bad request".to_string())
    );
    assert_eq!(error_message(&json!({ "detail": "x" })), None);
  }
}
