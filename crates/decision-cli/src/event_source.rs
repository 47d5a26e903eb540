//! Locating the repository event that drives the decision.

use crate::client::QueueClient;
use crate::config::Environment;
use decision_core::{Error, Event, Result};
use std::path::Path;
use tracing::{info, warn};

/// Load the event from the first available source: an explicit file, the
/// `TASK_EVENT` variable, then the running task's own definition.
pub async fn load_event(
    event_path: Option<&Path>,
    env: &Environment,
    client: &QueueClient,
) -> Result<Event> {
    if let Some(path) = event_path {
        info!(path = %path.display(), "Reading event from file");
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        return Event::from_json_str(&content);
    }

    if let Some(raw) = &env.task_event {
        info!("Reading event from TASK_EVENT");
        return Event::from_json_str(raw);
    }

    let Some(task_id) = &env.task_id else {
        warn!("Missing TASK_ID environment variable");
        return Err(Error::MissingEventSource);
    };

    info!(task_id = %task_id, "Reading event from task definition");
    client
        .fetch_task_event(task_id)
        .await?
        .ok_or(Error::MissingEventSource)
}
