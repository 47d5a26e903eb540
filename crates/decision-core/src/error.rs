//! Error types for the decision task.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Event errors
    #[error("Can't find GitHub event definition; for local testing pass --event-path")]
    MissingEventSource,

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    // Catalog errors
    #[error("Invalid task definition for {task}: {reason}")]
    InvalidCatalog { task: String, reason: String },

    #[error("Task {task} requires unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },

    #[error("Cycle detected in task requirements: {}", chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },

    // Scheduling errors
    #[error("Can't compute jobs for task {task}: {reason}")]
    MissingJobData { task: String, reason: String },

    #[error("Invalid job rules: {0}")]
    InvalidJobRules(String),

    // Infrastructure errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Queue rejected task {task_id} ({status}): {message}")]
    Queue {
        task_id: String,
        status: u16,
        message: String,
    },

    #[error("Git error: {0}")]
    Git(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error stems from user-supplied configuration rather than
    /// infrastructure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingEventSource
                | Error::InvalidEvent(_)
                | Error::InvalidCatalog { .. }
                | Error::UnknownDependency { .. }
                | Error::CycleDetected { .. }
                | Error::MissingJobData { .. }
                | Error::InvalidJobRules(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
