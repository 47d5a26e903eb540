//! Command handlers.

use crate::client::QueueClient;
use crate::commands::Cli;
use crate::config::{DecisionConfig, Environment};
use crate::event_source::load_event;
use crate::git::GitChangedPaths;
use crate::output::{write_graph, write_graph_file};
use console::style;
use decision_core::Catalog;
use decision_graph::{
    BuildContext, GraphBuilder, JobClassifier, JobRules, create_tasks, filter_schedule_if,
    filter_triggers,
};
use std::time::Duration;
use tracing::info;

/// Resolve the task graph for the current event and submit it, or print it
/// on a dry run.
pub async fn decide(
    cli: &Cli,
    config: &DecisionConfig,
    env: &Environment,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = QueueClient::new(config)?;
    let event = load_event(cli.event_path.as_deref(), env, &client).await?;

    let catalog = Catalog::load(&cli.catalog_path)?;
    info!(path = %cli.catalog_path.display(), tasks = catalog.len(), "Loaded task catalog");
    let rules = match &cli.jobs_path {
        Some(path) => JobRules::load(path)?,
        None => JobRules::new(),
    };

    let triggered = filter_triggers(&event, &catalog);
    let git = GitChangedPaths::new(&cli.repo_path, Duration::from_secs(config.git_timeout_secs));
    let classifier = JobClassifier::new(&rules, &git);
    let scheduled = filter_schedule_if(&event, &triggered, &classifier).await?;

    let context = BuildContext::new(env.task_group_id()?).with_workers(config.worker_policy());
    let graph = GraphBuilder::new(&catalog, &context).build(&event, &scheduled)?;
    info!(
        task_group_id = %context.task_group_id,
        tasks = graph.len(),
        "Resolved task graph"
    );

    if cli.dry_run {
        write_graph(&mut std::io::stdout().lock(), &graph)?;
    } else {
        let created = create_tasks(&client, &graph, config.submit_concurrency).await?;
        eprintln!("{} Created {} tasks", style("✓").green(), created);
    }

    if let Some(path) = &cli.tasks_path {
        write_graph_file(path, &graph)?;
        info!(path = %path.display(), "Wrote task graph");
    }

    Ok(())
}

/// Coarse failure category for the final log line: problems with the inputs
/// the decision was given, or with the services it talks to.
pub fn failure_kind(err: &(dyn std::error::Error + 'static)) -> &'static str {
    match err.downcast_ref::<decision_core::Error>() {
        Some(err) if err.is_configuration() => "input",
        Some(_) => "infrastructure",
        None => "setup",
    }
}
