//! Task graph resolution for the CI decision task.
//!
//! Turns an event and a task catalog into an ordered set of queue tasks:
//! trigger matching, job-class scheduling, dependency resolution, command
//! rendering and submission.

pub mod command;
pub mod graph;
pub mod jobs;
pub mod schedule;
pub mod submit;
pub mod triggers;

pub use graph::{BuildContext, GraphBuilder, TaskGraph, WorkerPolicy};
pub use jobs::{JobClassifier, JobRules};
pub use schedule::filter_schedule_if;
pub use submit::create_tasks;
pub use triggers::{TriggerMatcher, filter_triggers};
