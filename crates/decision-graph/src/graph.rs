//! Task graph resolution.
//!
//! Scheduled tasks are resolved depth-first: every task's `require` entries
//! are materialized (from the full catalog, scheduled or not) before the task
//! itself, so the resulting graph is in dependency-first insertion order and
//! every dependency id refers to an entry that precedes it.

use crate::command::build_full_command;
use chrono::{DateTime, Utc};
use decision_core::catalog::TaskDefinition;
use decision_core::ids::{TaskGroupId, TaskId};
use decision_core::ports::{IdGenerator, SlugIdGenerator};
use decision_core::task::{Priority, ResolvedTask, TaskExtra, TaskMetadata, TaskPayload, TaskRecord};
use decision_core::time::{from_now, to_json_timestamp};
use decision_core::{Catalog, Error, Event, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Chooses the worker pool tasks run on.
///
/// Events from the trusted repository get dedicated workers; forks and
/// everything else share the generic pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPolicy {
    pub trusted_repository: String,
    pub trusted_worker_type: String,
    pub default_worker_type: String,
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self {
            trusted_repository: "web-platform-tests/wpt".to_string(),
            trusted_worker_type: "wpt-docker-worker".to_string(),
            default_worker_type: "github-worker".to_string(),
        }
    }
}

impl WorkerPolicy {
    pub fn worker_type(&self, event: &Event) -> &str {
        if event.repository_full_name() == Some(self.trusted_repository.as_str()) {
            &self.trusted_worker_type
        } else {
            &self.default_worker_type
        }
    }
}

/// Inputs shared by every task in one build.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub task_group_id: TaskGroupId,
    /// Reference point for `created` and relative deadlines.
    pub now: DateTime<Utc>,
    pub workers: WorkerPolicy,
}

impl BuildContext {
    pub fn new(task_group_id: TaskGroupId) -> Self {
        Self {
            task_group_id,
            now: Utc::now(),
            workers: WorkerPolicy::default(),
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_workers(mut self, workers: WorkerPolicy) -> Self {
        self.workers = workers;
        self
    }
}

/// Resolved tasks keyed by name, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    entries: Vec<(String, ResolvedTask)>,
    index: HashMap<String, usize>,
    ids: HashSet<TaskId>,
}

impl TaskGraph {
    fn insert(&mut self, name: &str, task: ResolvedTask) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(Error::Internal(format!("task {} resolved twice", name)));
        }
        if !self.ids.insert(task.id.clone()) {
            return Err(Error::Internal(format!(
                "generated task id {} is not unique",
                task.id
            )));
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push((name.to_string(), task));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedTask> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedTask)> {
        self.entries.iter().map(|(name, task)| (name.as_str(), task))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty-printed JSON of `name -> [id, record]`.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for TaskGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, task) in &self.entries {
            map.serialize_entry(name, &(&task.id, &task.record))?;
        }
        map.end()
    }
}

struct Frame<'a> {
    task: &'a TaskDefinition,
    next_dep: usize,
}

/// Builds a [`TaskGraph`] for one event.
pub struct GraphBuilder<'a> {
    catalog: &'a Catalog,
    context: &'a BuildContext,
    ids: &'a dyn IdGenerator,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(catalog: &'a Catalog, context: &'a BuildContext) -> Self {
        Self {
            catalog,
            context,
            ids: &SlugIdGenerator,
        }
    }

    pub fn with_id_generator(mut self, ids: &'a dyn IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Resolve `scheduled` and everything it requires.
    pub fn build(&self, event: &Event, scheduled: &[&'a TaskDefinition]) -> Result<TaskGraph> {
        let mut graph = TaskGraph::default();

        for &root in scheduled {
            if !graph.contains(&root.name) {
                self.resolve(event, root, &mut graph)?;
            }
        }

        info!(
            scheduled = scheduled.len(),
            total = graph.len(),
            task_group = %self.context.task_group_id,
            "Task graph resolved"
        );
        Ok(graph)
    }

    /// Resolve one task and its unresolved requirements without recursion.
    fn resolve(&self, event: &Event, root: &'a TaskDefinition, graph: &mut TaskGraph) -> Result<()> {
        let mut stack = vec![Frame {
            task: root,
            next_dep: 0,
        }];
        let mut in_progress: HashSet<&'a str> = HashSet::from([root.name.as_str()]);

        loop {
            let Some(frame) = stack.last_mut() else {
                return Ok(());
            };
            let task = frame.task;

            if let Some(dep_name) = task.require.get(frame.next_dep) {
                frame.next_dep += 1;
                if graph.contains(dep_name) {
                    continue;
                }
                if in_progress.contains(dep_name.as_str()) {
                    return Err(cycle_error(&stack, dep_name));
                }
                let dep = self
                    .catalog
                    .get(dep_name)
                    .ok_or_else(|| Error::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep_name.clone(),
                    })?;
                debug!(task = %task.name, dependency = %dep.name, "Resolving requirement");
                in_progress.insert(dep.name.as_str());
                stack.push(Frame {
                    task: dep,
                    next_dep: 0,
                });
                continue;
            }

            stack.pop();
            in_progress.remove(task.name.as_str());

            let dependencies = task
                .require
                .iter()
                .map(|name| {
                    graph.get(name).map(|t| t.id.clone()).ok_or_else(|| {
                        Error::Internal(format!("requirement {} of {} was not resolved", name, task.name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let resolved = self.create_task(event, task, dependencies)?;
            debug!(task = %task.name, id = %resolved.id, "Task resolved");
            graph.insert(&task.name, resolved)?;
        }
    }

    fn create_task(
        &self,
        event: &Event,
        task: &TaskDefinition,
        dependencies: Vec<TaskId>,
    ) -> Result<ResolvedTask> {
        let command = build_full_command(event, task)?;
        let deadline = from_now(&task.deadline, self.context.now).map_err(|e| Error::InvalidCatalog {
            task: task.name.clone(),
            reason: e.to_string(),
        })?;

        let record = TaskRecord {
            task_group_id: self.context.task_group_id.clone(),
            created: to_json_timestamp(self.context.now),
            deadline: to_json_timestamp(deadline),
            provisioner_id: task.provisioner_id.clone(),
            worker_type: self.context.workers.worker_type(event).to_string(),
            priority: Priority::Lowest,
            metadata: TaskMetadata {
                name: task.name.clone(),
                description: task.description.clone().unwrap_or_default(),
                owner: format!("{}@users.noreply.github.com", event.sender_login()?),
                source: event.repository_url()?.to_string(),
            },
            payload: TaskPayload {
                artifacts: task.artifacts.clone(),
                command,
                image: task.image.clone(),
                max_run_time: task.max_run_time,
                env: task.env.clone(),
            },
            extra: TaskExtra {
                github_event: event.to_json_string(),
            },
            dependencies: vec![],
            requires: None,
        }
        .with_dependencies(dependencies);

        Ok(ResolvedTask {
            id: self.ids.next_id(),
            record,
        })
    }
}

/// Error naming the in-progress chain from the re-entered task back to itself.
fn cycle_error(stack: &[Frame<'_>], repeated: &str) -> Error {
    let start = stack
        .iter()
        .position(|f| f.task.name == repeated)
        .unwrap_or(0);
    let mut chain: Vec<String> = stack[start..].iter().map(|f| f.task.name.clone()).collect();
    chain.push(repeated.to_string());
    Error::CycleDetected { chain }
}
