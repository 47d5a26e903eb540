//! Job classification.
//!
//! A job class is a label for a category of work affected by a change, such
//! as `lint` or `build_css`. The classes for an event come from two places:
//! the paths changed between `before` and `after`, mapped through
//! [`JobRules`], and an explicit `tc-jobs: a, b` line in the commit message or
//! pull request body.

use decision_core::ports::ChangedPaths;
use decision_core::{Error, Event, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Token that selects every job.
pub const ALL_JOBS: &str = "all";

static TC_JOBS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*tc-jobs:(.*)$").expect("tc-jobs regex is valid"));

/// Include/exclude path rules for one job.
#[derive(Debug, Clone)]
struct Ruleset {
    job: String,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl Ruleset {
    fn new(job: String, rules: &[String]) -> Result<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for rule in rules {
            let (target, pattern) = match rule.strip_prefix('!') {
                Some(rest) => (&mut exclude, rest),
                None => (&mut include, rule.as_str()),
            };
            let re = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
                Error::InvalidJobRules(format!("job {}: rule {:?}: {}", job, rule, e))
            })?;
            target.push(re);
        }
        Ok(Self {
            job,
            include,
            exclude,
        })
    }

    fn matches(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        if self.exclude.iter().any(|re| re.is_match(&path)) {
            return false;
        }
        self.include.iter().any(|re| re.is_match(&path))
    }
}

/// Mapping from job name to the paths that make it run.
#[derive(Debug, Clone, Default)]
pub struct JobRules {
    rulesets: Vec<Ruleset>,
}

impl JobRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build rules from `(job, rules)` pairs.
    pub fn from_rules<I, S>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        let rulesets = rules
            .into_iter()
            .map(|(job, rules)| Ruleset::new(job.into(), &rules))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rulesets })
    }

    /// Parse a YAML mapping of job name to rule list.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| Error::InvalidJobRules(e.to_string()))?;
        let mapping = match root {
            serde_yaml::Value::Null => return Ok(Self::new()),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::InvalidJobRules(
                    "job rules must be a mapping of job name to path rules".to_string(),
                ));
            }
        };

        let mut pairs = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let job = key
                .as_str()
                .ok_or_else(|| Error::InvalidJobRules(format!("job name {:?} is not a string", key)))?
                .to_string();
            let rules: Vec<String> = serde_yaml::from_value(value)
                .map_err(|e| Error::InvalidJobRules(format!("job {}: {}", job, e)))?;
            pairs.push((job, rules));
        }
        Self::from_rules(pairs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read job rules {}: {}", path.display(), e),
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Jobs selected by at least one of `paths`.
    pub fn jobs_for_paths<S: AsRef<str>>(&self, paths: &[S]) -> BTreeSet<String> {
        let mut jobs = BTreeSet::new();
        for ruleset in &self.rulesets {
            if paths.iter().any(|p| ruleset.matches(p.as_ref())) {
                jobs.insert(ruleset.job.clone());
            }
        }
        jobs
    }

    pub fn is_empty(&self) -> bool {
        self.rulesets.is_empty()
    }
}

/// Jobs explicitly requested with a `tc-jobs:` line. Only the first such line
/// counts.
pub fn requested_jobs(event: &Event) -> BTreeSet<String> {
    let Some(body) = event.message_body() else {
        return BTreeSet::new();
    };

    body.lines()
        .find_map(|line| TC_JOBS.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|items| {
            items
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Computes the job-class set for an event.
pub struct JobClassifier<'a> {
    rules: &'a JobRules,
    paths: &'a dyn ChangedPaths,
}

impl<'a> JobClassifier<'a> {
    pub fn new(rules: &'a JobRules, paths: &'a dyn ChangedPaths) -> Self {
        Self { rules, paths }
    }

    /// Union of path-derived and explicitly requested jobs.
    ///
    /// `task` names the task that needs the answer and is only used for error
    /// reporting.
    pub async fn classify(&self, event: &Event, task: &str) -> Result<BTreeSet<String>> {
        let (before, after) = match (event.before(), event.after()) {
            (Some(before), Some(after)) => (before, after),
            _ => {
                return Err(Error::MissingJobData {
                    task: task.to_string(),
                    reason: "event has no before/after revisions to diff".to_string(),
                });
            }
        };

        let changed = self.paths.changed_paths(before, after).await?;
        debug!(count = changed.len(), range = %format!("{before}..{after}"), "Changed paths");

        let mut jobs = self.rules.jobs_for_paths(changed.as_slice());
        jobs.extend(requested_jobs(event));

        let listed: Vec<&str> = jobs.iter().map(String::as_str).collect();
        info!(jobs = %listed.join(", "), "Including jobs");
        Ok(jobs)
    }
}
