//! Decision task configuration.

use decision_core::TaskGroupId;
use decision_graph::WorkerPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use url::Url;

/// Decision task configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Root URL of the queue deployment.
    pub queue_root_url: String,
    /// Bearer token sent with queue requests.
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    /// Maximum number of task creation requests in flight.
    pub submit_concurrency: usize,
    pub trusted_repository: String,
    pub trusted_worker_type: String,
    pub default_worker_type: String,
    pub git_timeout_secs: u64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        let workers = WorkerPolicy::default();
        Self {
            queue_root_url: "http://taskcluster".to_string(),
            token: None,
            request_timeout_secs: 30,
            submit_concurrency: 8,
            trusted_repository: workers.trusted_repository,
            trusted_worker_type: workers.trusted_worker_type,
            default_worker_type: workers.default_worker_type,
            git_timeout_secs: 60,
        }
    }
}

impl DecisionConfig {
    /// Load configuration from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
                Self::from_yaml_str(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from the task environment. The proxy wins over the
    /// deployment root since it also supplies credentials.
    pub fn apply_env(&mut self, env: &Environment) {
        if let Some(url) = env.proxy_url.as_ref().or(env.root_url.as_ref()) {
            debug!(url = %url, "Queue root URL from environment");
            self.queue_root_url = url.clone();
        }
    }

    /// Check values that would otherwise only fail mid-run.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        Url::parse(&self.queue_root_url)
            .map_err(|e| format!("Invalid queue_root_url {:?}: {}", self.queue_root_url, e))?;
        if self.submit_concurrency == 0 {
            return Err("submit_concurrency must be at least 1".into());
        }
        if self.request_timeout_secs == 0 || self.git_timeout_secs == 0 {
            return Err("timeouts must be at least one second".into());
        }
        Ok(())
    }

    pub fn worker_policy(&self) -> WorkerPolicy {
        WorkerPolicy {
            trusted_repository: self.trusted_repository.clone(),
            trusted_worker_type: self.trusted_worker_type.clone(),
            default_worker_type: self.default_worker_type.clone(),
        }
    }
}

/// Variables the queue sets for a running task, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub task_id: Option<String>,
    pub task_event: Option<String>,
    pub proxy_url: Option<String>,
    pub root_url: Option<String>,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            task_id: get("TASK_ID"),
            task_event: get("TASK_EVENT"),
            proxy_url: get("TASKCLUSTER_PROXY_URL"),
            root_url: get("TASKCLUSTER_ROOT_URL"),
        }
    }

    /// The running task's id becomes the group id, so created tasks are
    /// grouped under the decision task. Local runs get a fresh group.
    pub fn task_group_id(&self) -> Result<TaskGroupId, Box<dyn std::error::Error>> {
        match &self.task_id {
            Some(task_id) => Ok(task_id.parse()?),
            None => Ok(TaskGroupId::new()),
        }
    }
}
