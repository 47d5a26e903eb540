//! Decision Core
//!
//! Core domain types, traits, and error handling for the CI decision task.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used by the graph engine and the command-line front end.

pub mod catalog;
pub mod error;
pub mod event;
pub mod ids;
pub mod ports;
pub mod task;
pub mod time;

pub use catalog::{Catalog, TaskDefinition};
pub use error::{Error, Result};
pub use event::Event;
pub use ids::*;
