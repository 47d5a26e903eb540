//! Trigger matching and evaluation.

use decision_core::catalog::{TaskDefinition, Trigger};
use decision_core::{Catalog, Event};
use tracing::info;

/// Matcher for determining if a task is a candidate for an event.
pub struct TriggerMatcher;

impl TriggerMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Check if a task should be triggered by an event.
    ///
    /// Tasks without a trigger never match.
    pub fn matches(&self, task: &TaskDefinition, event: &Event) -> bool {
        let Some(trigger) = &task.trigger else {
            return false;
        };
        self.trigger_matches(trigger, event)
    }

    fn trigger_matches(&self, trigger: &Trigger, event: &Event) -> bool {
        if event.is_pull_request() {
            return trigger.pull_request;
        }
        match (event.branch(), &trigger.branch) {
            (Some(branch), Some(patterns)) => self.branch_matches(patterns, branch),
            _ => false,
        }
    }

    fn branch_matches(&self, patterns: &[String], branch: &str) -> bool {
        patterns.iter().any(|p| self.pattern_matches(p, branch))
    }

    /// Exact match, or prefix match for patterns ending in `*`.
    fn pattern_matches(&self, pattern: &str, branch: &str) -> bool {
        if pattern == branch {
            return true;
        }
        match pattern.strip_suffix('*') {
            Some(prefix) => branch.starts_with(prefix),
            None => false,
        }
    }
}

impl Default for TriggerMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Select the catalog entries whose trigger matches `event`, in catalog order.
pub fn filter_triggers<'a>(event: &Event, catalog: &'a Catalog) -> Vec<&'a TaskDefinition> {
    let matcher = TriggerMatcher::new();
    catalog
        .iter()
        .filter(|task| {
            let matched = matcher.matches(task, event);
            if matched {
                info!(task = %task.name, "Triggers include task");
            }
            matched
        })
        .collect()
}
