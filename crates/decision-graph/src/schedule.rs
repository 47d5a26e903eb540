//! Schedule predicate filtering.

use crate::jobs::{ALL_JOBS, JobClassifier};
use decision_core::catalog::TaskDefinition;
use decision_core::{Event, Result};
use std::collections::BTreeSet;
use tracing::info;

/// Narrow triggered tasks by their `schedule-if` predicate.
///
/// Job classes are computed at most once, and only if some task asks for them.
pub async fn filter_schedule_if<'a>(
    event: &Event,
    triggered: &[&'a TaskDefinition],
    classifier: &JobClassifier<'_>,
) -> Result<Vec<&'a TaskDefinition>> {
    let mut run_jobs: Option<BTreeSet<String>> = None;
    let mut scheduled = Vec::with_capacity(triggered.len());

    for &task in triggered {
        let include = match task.run_jobs() {
            None => true,
            Some(wanted) => {
                let jobs = match run_jobs.take() {
                    Some(jobs) => jobs,
                    None => classifier.classify(event, &task.name).await?,
                };
                let selected =
                    jobs.contains(ALL_JOBS) || wanted.iter().any(|job| jobs.contains(job));
                run_jobs = Some(jobs);
                selected
            }
        };

        if include {
            info!(task = %task.name, "Scheduled tasks include");
            scheduled.push(task);
        }
    }

    Ok(scheduled)
}
