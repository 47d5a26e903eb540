//! Task catalog definitions.
//!
//! The catalog is a YAML mapping from task name to definition. It is loaded
//! once per invocation, validated eagerly, and then only read.

use crate::time::parse_relative;
use crate::{Error, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A schedulable task as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TaskDefinition {
    /// Taken from the catalog key.
    #[serde(skip)]
    pub name: String,
    #[serde(deserialize_with = "one_or_many")]
    pub command: Vec<String>,
    #[serde(default)]
    pub require: Vec<String>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub schedule_if: Option<ScheduleIf>,
    #[serde(default)]
    pub options: TaskOptions,
    #[serde(default)]
    pub install: Vec<String>,
    #[serde(default = "default_deadline")]
    pub deadline: String,
    #[serde(default, rename = "maxRunTime")]
    pub max_run_time: Option<u64>,
    #[serde(default)]
    pub artifacts: Option<serde_json::Value>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_provisioner", rename = "provisionerId")]
    pub provisioner_id: String,
}

fn default_deadline() -> String {
    "24 hours".to_string()
}

fn default_provisioner() -> String {
    "aws-provisioner-v1".to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// When a task becomes a candidate for an event.
///
/// Accepts `trigger: pull-request`, `trigger: [pull-request]` or a mapping
/// with `pull-request` and `branch` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "TriggerSpec")]
pub struct Trigger {
    pub pull_request: bool,
    pub branch: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TriggerSpec {
    Event(String),
    Events(Vec<String>),
    Table(TriggerTable),
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct TriggerTable {
    /// `pull-request:` with no value counts as enabled.
    #[serde(default, deserialize_with = "present_or_bool")]
    pull_request: bool,
    #[serde(default)]
    branch: Option<Vec<String>>,
}

impl TryFrom<TriggerSpec> for Trigger {
    type Error = String;

    fn try_from(spec: TriggerSpec) -> std::result::Result<Self, Self::Error> {
        let events = match spec {
            TriggerSpec::Table(table) => {
                return Ok(Self {
                    pull_request: table.pull_request,
                    branch: table.branch,
                });
            }
            TriggerSpec::Event(event) => vec![event],
            TriggerSpec::Events(events) => events,
        };

        let mut trigger = Self::default();
        for event in events {
            match event.as_str() {
                "pull-request" => trigger.pull_request = true,
                other => {
                    return Err(format!(
                        "unknown trigger {:?}; branches go under `branch:`",
                        other
                    ));
                }
            }
        }
        Ok(trigger)
    }
}

fn present_or_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

/// Secondary condition narrowing triggered tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScheduleIf {
    pub run_job: Vec<String>,
}

/// Flags passed through to the in-task runner script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TaskOptions {
    #[serde(default)]
    pub oom_killer: bool,
    #[serde(default)]
    pub xvfb: bool,
    #[serde(default)]
    pub hosts: bool,
    #[serde(default)]
    pub checkout: Option<String>,
    #[serde(default)]
    pub browser: Vec<String>,
    #[serde(default)]
    pub install_certificates: bool,
}

impl TaskDefinition {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            require: vec![],
            trigger: None,
            schedule_if: None,
            options: TaskOptions::default(),
            install: vec![],
            deadline: default_deadline(),
            max_run_time: None,
            artifacts: None,
            image: None,
            env: BTreeMap::new(),
            description: None,
            provisioner_id: default_provisioner(),
        }
    }

    /// Job-class tokens this task waits for, if it has a schedule predicate.
    pub fn run_jobs(&self) -> Option<&[String]> {
        self.schedule_if.as_ref().map(|s| s.run_job.as_slice())
    }

    fn validate(&self) -> Result<()> {
        if self.command.is_empty() {
            return Err(self.invalid("command must not be empty"));
        }
        parse_relative(&self.deadline)
            .map_err(|_| self.invalid(format!("invalid deadline {:?}", self.deadline)))?;
        if let Some(schedule) = &self.schedule_if
            && schedule.run_job.is_empty()
        {
            return Err(self.invalid("schedule-if.run-job must list at least one job"));
        }
        if let Some(trigger) = &self.trigger
            && let Some(branches) = &trigger.branch
            && branches.iter().any(|b| b.is_empty())
        {
            return Err(self.invalid("trigger.branch contains an empty pattern"));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::InvalidCatalog {
            task: self.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Ordered, name-indexed set of task definitions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tasks: Vec<TaskDefinition>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog without dependency validation.
    ///
    /// Names must still be unique.
    pub fn from_definitions(defs: impl IntoIterator<Item = TaskDefinition>) -> Result<Self> {
        let mut catalog = Self::default();
        for def in defs {
            if catalog.index.contains_key(&def.name) {
                return Err(def.invalid("duplicate task name"));
            }
            catalog.index.insert(def.name.clone(), catalog.tasks.len());
            catalog.tasks.push(def);
        }
        Ok(catalog)
    }

    /// Parse and validate a catalog document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(content)?;
        let mapping = match root {
            serde_yaml::Value::Null => return Ok(Self::default()),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::InvalidCatalog {
                    task: "<root>".to_string(),
                    reason: "catalog must be a mapping of task name to definition".to_string(),
                });
            }
        };

        let mut defs = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = key.as_str().ok_or_else(|| Error::InvalidCatalog {
                task: format!("{:?}", key),
                reason: "task names must be strings".to_string(),
            })?;
            let mut def: TaskDefinition =
                serde_yaml::from_value(value).map_err(|e| Error::InvalidCatalog {
                    task: name.to_string(),
                    reason: e.to_string(),
                })?;
            def.name = name.to_string();
            defs.push(def);
        }

        let catalog = Self::from_definitions(defs)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read catalog {}: {}", path.display(), e),
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check per-task fields, `require` references and acyclicity.
    pub fn validate(&self) -> Result<()> {
        for task in &self.tasks {
            task.validate()?;
            for dep in &task.require {
                if !self.index.contains_key(dep) {
                    return Err(Error::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut graph = DiGraph::<&str, ()>::new();
        let nodes: Vec<_> = self
            .tasks
            .iter()
            .map(|t| graph.add_node(t.name.as_str()))
            .collect();
        for (i, task) in self.tasks.iter().enumerate() {
            for dep in &task.require {
                graph.add_edge(nodes[i], nodes[self.index[dep]], ());
            }
        }

        for component in tarjan_scc(&graph) {
            let self_loop = component.len() == 1 && graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || self_loop {
                let mut chain: Vec<String> =
                    component.iter().rev().map(|&n| graph[n].to_string()).collect();
                chain.push(chain[0].clone());
                return Err(Error::CycleDetected { chain });
            }
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in document order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
