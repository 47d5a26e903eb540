//! Submission of a resolved graph to the queue.

use crate::graph::TaskGraph;
use decision_core::ids::TaskId;
use decision_core::ports::TaskQueue;
use decision_core::task::ResolvedTask;
use decision_core::Result;
use futures::stream::{self, TryStreamExt};
use std::collections::HashMap;
use tracing::{debug, info};

/// Split a graph into waves: every task lands in a later wave than all of its
/// dependencies. Order within a wave follows the graph.
pub fn submission_waves(graph: &TaskGraph) -> Vec<Vec<(&str, &ResolvedTask)>> {
    let mut level: HashMap<&TaskId, usize> = HashMap::new();
    let mut waves: Vec<Vec<(&str, &ResolvedTask)>> = Vec::new();

    for (name, task) in graph.iter() {
        let wave = task
            .record
            .dependencies
            .iter()
            .filter_map(|dep| level.get(dep))
            .map(|l| l + 1)
            .max()
            .unwrap_or(0);
        level.insert(&task.id, wave);
        if waves.len() <= wave {
            waves.resize_with(wave + 1, Vec::new);
        }
        waves[wave].push((name, task));
    }

    waves
}

/// Create every task in `graph`.
///
/// Tasks are created wave by wave with at most `concurrency` requests in
/// flight, so a task is only created once all of its dependencies exist. The
/// first failure aborts the submission.
pub async fn create_tasks(queue: &dyn TaskQueue, graph: &TaskGraph, concurrency: usize) -> Result<usize> {
    let concurrency = concurrency.max(1);
    let waves = submission_waves(graph);

    for (index, wave) in waves.iter().enumerate() {
        debug!(wave = index, tasks = wave.len(), "Submitting wave");
        stream::iter(wave.iter().map(Ok))
            .try_for_each_concurrent(concurrency, |&(name, task)| async move {
                queue.create_task(&task.id, &task.record).await?;
                info!(task = %name, id = %task.id, "Created task");
                Ok::<(), decision_core::Error>(())
            })
            .await?;
    }

    info!(count = graph.len(), "All tasks created");
    Ok(graph.len())
}
