//! Resolved task records, as submitted to the queue.

use crate::ids::{TaskGroupId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Queue priority. The decision task only ever schedules at `lowest`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Highest,
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
    #[default]
    Lowest,
}

/// How a task's dependencies gate its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Requires {
    AllCompleted,
    AllResolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub name: String,
    pub description: String,
    pub owner: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub artifacts: Option<serde_json::Value>,
    pub command: Vec<String>,
    pub image: Option<String>,
    pub max_run_time: Option<u64>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExtra {
    /// The triggering event, JSON-encoded.
    pub github_event: String,
}

/// Task creation request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_group_id: TaskGroupId,
    pub created: String,
    pub deadline: String,
    pub provisioner_id: String,
    pub worker_type: String,
    pub priority: Priority,
    pub metadata: TaskMetadata,
    pub payload: TaskPayload,
    pub extra: TaskExtra,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Requires>,
}

impl TaskRecord {
    /// Wire `dependencies` and keep `requires` consistent with them.
    pub fn with_dependencies(mut self, dependencies: Vec<TaskId>) -> Self {
        self.requires = if dependencies.is_empty() {
            None
        } else {
            Some(Requires::AllCompleted)
        };
        self.dependencies = dependencies;
        self
    }
}

/// A record together with the id it will be created under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTask {
    pub id: TaskId,
    pub record: TaskRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> TaskRecord {
        TaskRecord {
            task_group_id: TaskGroupId::new(),
            created: "2020-01-01T00:00:00.000Z".to_string(),
            deadline: "2020-01-02T00:00:00.000Z".to_string(),
            provisioner_id: "aws-provisioner-v1".to_string(),
            worker_type: "github-worker".to_string(),
            priority: Priority::Lowest,
            metadata: TaskMetadata {
                name: "lint".to_string(),
                description: String::new(),
                owner: "octocat@users.noreply.github.com".to_string(),
                source: "https://github.com/web-platform-tests/wpt".to_string(),
            },
            payload: TaskPayload {
                artifacts: None,
                command: vec!["/bin/bash".to_string()],
                image: Some("harjgam/web-platform-tests:0.11".to_string()),
                max_run_time: Some(7200),
                env: BTreeMap::new(),
            },
            extra: TaskExtra {
                github_event: "{}".to_string(),
            },
            dependencies: vec![],
            requires: None,
        }
    }

    #[test]
    fn test_wire_names() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["priority"], json!("lowest"));
        assert_eq!(value["payload"]["maxRunTime"], json!(7200));
        assert!(value.get("taskGroupId").is_some());
        assert!(value.get("dependencies").is_none());
        assert!(value.get("requires").is_none());
    }

    #[test]
    fn test_dependencies_set_requires() {
        let dep = TaskId::new();
        let value = serde_json::to_value(record().with_dependencies(vec![dep.clone()])).unwrap();
        assert_eq!(value["dependencies"], json!([dep.as_str()]));
        assert_eq!(value["requires"], json!("all-completed"));
    }
}
