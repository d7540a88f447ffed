//! Task and Project domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Resource;

fn is_false(flag: &bool) -> bool {
  !*flag
}

/// A task inside one project. The owning project's id is the task's scope
/// key in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: String,
  #[serde(default)]
  pub project_id: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub is_completed: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  /// Marks a not-yet-confirmed optimistic placeholder. Never sent to the
  /// server; replaced wholesale on the next load.
  #[serde(default, skip_serializing_if = "is_false")]
  pub pending: bool,
}

impl Resource for Task {
  fn id(&self) -> &str {
    &self.id
  }

  fn collection_name() -> &'static str {
    "tasks"
  }

  fn entity_name() -> &'static str {
    "task"
  }

  fn label() -> &'static str {
    "task"
  }

  fn display_name() -> &'static str {
    "Task"
  }

  fn collection_path(scope: &str) -> String {
    format!("/projects/{scope}/tasks")
  }

  fn entity_path(id: &str) -> String {
    format!("/tasks/{id}")
  }

  fn is_pending(&self) -> bool {
    self.pending
  }
}

/// Scope key for the projects collection; projects are not nested under
/// any parent resource.
pub const ALL_PROJECTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "is_false")]
  pub pending: bool,
}

impl Resource for Project {
  fn id(&self) -> &str {
    &self.id
  }

  fn collection_name() -> &'static str {
    "projects"
  }

  fn entity_name() -> &'static str {
    "project"
  }

  fn label() -> &'static str {
    "project"
  }

  fn display_name() -> &'static str {
    "Project"
  }

  fn collection_path(_scope: &str) -> String {
    "/projects".to_string()
  }

  fn entity_path(id: &str) -> String {
    format!("/projects/{id}")
  }

  fn is_pending(&self) -> bool {
    self.pending
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn task_deserializes_from_partial_payloads() {
    let task: Task = serde_json::from_value(json!({ "id": "t1", "title": "A" })).unwrap();

    assert_eq!(task.project_id, "");
    assert!(!task.is_completed);
    assert!(!task.pending);
  }

  #[test]
  fn pending_marker_survives_a_merge_round_trip() {
    let task: Task = serde_json::from_value(json!({
      "id": "local-1",
      "title": "A",
      "pending": true
    }))
    .unwrap();

    let value = serde_json::to_value(&task).unwrap();
    let back: Task = serde_json::from_value(value).unwrap();
    assert!(back.pending);
  }

  #[test]
  fn confirmed_entities_omit_the_pending_marker_on_the_wire() {
    let task: Task = serde_json::from_value(json!({ "id": "t1", "title": "A" })).unwrap();
    let value = serde_json::to_value(&task).unwrap();
    assert!(value.get("pending").is_none());
  }

  #[test]
  fn endpoint_paths_follow_the_route_layer() {
    assert_eq!(Task::collection_path("p1"), "/projects/p1/tasks");
    assert_eq!(Task::entity_path("t1"), "/tasks/t1");
    assert_eq!(Project::collection_path(ALL_PROJECTS), "/projects");
    assert_eq!(Project::entity_path("p1"), "/projects/p1");
  }
}
