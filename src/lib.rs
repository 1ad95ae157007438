//! # Taskforge
//!
//! An in-memory task engine: it stores tasks, indexes them for prefix search,
//! tracks dependencies between them as a directed acyclic graph, schedules
//! them by priority and plans execution orders, with undo/redo for every
//! mutation.
//!
//! ## Architecture Overview
//!
//! - **[`task`]**: the engine itself: store, search index, dependency graph,
//!   scheduler, optimizer and command history, tied together by
//!   [`TaskManager`]
//! - **[`config`]**: TOML-backed engine configuration
//! - **[`error`]**: the typed error taxonomy shared by every operation
//!
//! The engine is single-threaded and synchronous. Hosts that use it from
//! several threads serialize access themselves.
//!
//! ## Quick Start
//!
//! ```rust
//! use taskforge::{EngineConfig, TaskManager, TaskSpec};
//!
//! # fn main() -> taskforge::Result<()> {
//! let mut manager = TaskManager::new(EngineConfig::default())?;
//!
//! let schema = manager.create_task(TaskSpec::new("Design schema", "Tables and keys", 5, 2.0))?;
//! let api = manager.create_task(TaskSpec::new("Build API", "REST endpoints", 3, 3.0))?;
//! manager.add_dependency(&schema.id, &api.id)?;
//!
//! let ready = manager.get_ready_tasks();
//! assert_eq!(ready.len(), 1);
//! assert_eq!(ready[0].id, schema.id);
//!
//! assert!(manager.undo()?);
//! assert_eq!(manager.get_ready_tasks().len(), 2);
//! # Ok(())
//! # }
//! ```

/// Engine configuration loaded from TOML.
pub mod config;

/// Error types returned by engine operations.
pub mod error;

/// Task storage, indexing, dependency tracking, scheduling and undo/redo.
pub mod task;

pub use config::EngineConfig;
pub use error::{Result, TaskError};
pub use task::{
    EngineSnapshot, GreedySchedule, LoggingEventHandler, Task, TaskEvent, TaskEventHandler,
    TaskId, TaskManager, TaskSpec, TaskStatus, TaskUpdate,
};
