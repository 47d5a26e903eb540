//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the graph engine and external
//! adapters: the task queue, the version-control history and id generation.

use crate::Result;
use crate::ids::TaskId;
use crate::task::TaskRecord;
use async_trait::async_trait;

/// Remote queue accepting task creation requests.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Create a task under the given id.
    async fn create_task(&self, task_id: &TaskId, task: &TaskRecord) -> Result<()>;
}

/// Source of the paths touched between two revisions.
#[async_trait]
pub trait ChangedPaths: Send + Sync {
    /// Paths changed in the range `base..head`, relative to the repository root.
    async fn changed_paths(&self, base: &str, head: &str) -> Result<Vec<String>>;
}

/// Generator for task ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> TaskId;
}

/// Random slug ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugIdGenerator;

impl IdGenerator for SlugIdGenerator {
    fn next_id(&self) -> TaskId {
        TaskId::new()
    }
}
