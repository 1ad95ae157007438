use crate::config::EngineConfig;
use crate::error::{Result, TaskError};
use crate::task::commands::*;
use crate::task::graph::DependencyEdge;
use crate::task::history::{Command, CommandHistory};
use crate::task::optimizer::{GreedySchedule, Optimizer};
use crate::task::scheduler::PriorityScheduler;
use crate::task::search::tokenize;
use crate::task::state::EngineState;
use crate::task::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Central task engine.
///
/// Owns the store, search index, dependency graph and undo history. Every
/// mutation runs as a [`Command`] through the history; reads go straight to
/// the underlying structures. The engine does no locking of its own: hosts
/// that share it between threads must serialize calls (for example behind a
/// `Mutex`).
pub struct TaskManager {
    state: EngineState,
    history: CommandHistory,
    optimizer: Optimizer,
    config: EngineConfig,
    next_sequence: u64,
    event_handlers: Vec<Box<dyn TaskEventHandler + Send + Sync>>,
}

/// Events reported to handlers after each successful mutation
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    TaskCreated { task_id: TaskId },
    TaskUpdated { task_id: TaskId },
    TaskDeleted { task_id: TaskId },
    DependencyAdded { from: TaskId, to: TaskId },
    DependencyRemoved { from: TaskId, to: TaskId },
    /// The wrapped event was reverted
    Undone(Box<TaskEvent>),
    /// The wrapped event was re-applied
    Redone(Box<TaskEvent>),
}

/// Handler for task events
pub trait TaskEventHandler {
    fn handle_event(&self, event: &TaskEvent) -> anyhow::Result<()>;
}

/// Serializable engine contents: tasks plus the dependency edge list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub tasks: Vec<Task>,
    pub edges: Vec<DependencyEdge>,
}

impl TaskManager {
    /// Create a new, empty engine
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: EngineState::new(&config),
            history: CommandHistory::new(config.history_capacity),
            optimizer: Optimizer::new(config.max_optimizer_tasks),
            config,
            next_sequence: 0,
            event_handlers: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a new pending task
    pub fn create_task(&mut self, spec: TaskSpec) -> Result<Task> {
        spec.validate()?;
        let task = Task::new(spec, self.next_sequence);
        self.next_sequence += 1;

        let task_id = task.id.clone();
        self.run(Box::new(CreateTaskCommand::new(task)))?;

        debug!("Created task {}", task_id);
        self.state.task(&task_id).cloned()
    }

    pub fn get_task(&self, task_id: &TaskId) -> Option<&Task> {
        self.state.store.get(task_id)
    }

    /// Every task in creation order
    pub fn get_all_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.state.store.values().cloned().collect();
        tasks.sort_by_key(|t| t.sequence);
        tasks
    }

    pub fn task_count(&self) -> usize {
        self.state.store.len()
    }

    /// Apply field changes to a task
    pub fn update_task(&mut self, task_id: &TaskId, update: TaskUpdate) -> Result<Task> {
        update.validate()?;
        let before = self.state.task(task_id)?.clone();
        let mut after = before.clone();
        after.apply(&update);

        if before.status != after.status {
            info!(
                "Task {} status: {} -> {}",
                task_id, before.status, after.status
            );
        }

        self.run(Box::new(UpdateTaskCommand::new(before, after)))?;
        self.state.task(task_id).cloned()
    }

    /// Mark a task completed, recording the hours actually spent
    pub fn complete_task(&mut self, task_id: &TaskId, actual_time: f64) -> Result<Task> {
        self.update_task(
            task_id,
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                actual_time: Some(actual_time),
                ..Default::default()
            },
        )
    }

    /// Delete a task; `Ok(false)` if it does not exist
    pub fn delete_task(&mut self, task_id: &TaskId) -> Result<bool> {
        if !self.state.store.contains(task_id) {
            debug!("Delete ignored for unknown task {}", task_id);
            return Ok(false);
        }
        self.run(Box::new(DeleteTaskCommand::new(task_id.clone())))?;
        info!("Deleted task {}", task_id);
        Ok(true)
    }

    /// Make `to` depend on `from`
    pub fn add_dependency(&mut self, from: &TaskId, to: &TaskId) -> Result<()> {
        self.state.task(from)?;
        self.state.task(to)?;
        if self.state.graph.has_edge(from, to) {
            debug!("Dependency {} -> {} already present", from, to);
            return Ok(());
        }

        match self.run(Box::new(AddDependencyCommand::new(from.clone(), to.clone()))) {
            Ok(()) => {
                info!("Added dependency {} -> {}", from, to);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected dependency {} -> {}: {}", from, to, e);
                Err(e)
            }
        }
    }

    /// Remove `from -> to`; `Ok(false)` if there was no such edge
    pub fn remove_dependency(&mut self, from: &TaskId, to: &TaskId) -> Result<bool> {
        if !self.state.graph.has_edge(from, to) {
            return Ok(false);
        }
        self.run(Box::new(RemoveDependencyCommand::new(from.clone(), to.clone())))?;
        info!("Removed dependency {} -> {}", from, to);
        Ok(true)
    }

    pub fn dependency_edges(&self) -> Vec<DependencyEdge> {
        self.state.graph.edges()
    }

    /// Topological order of every task
    pub fn get_task_execution_order(&self) -> Result<Vec<TaskId>> {
        self.state.graph.topological_order()
    }

    /// Pending tasks whose dependencies are all completed, in creation order
    pub fn get_ready_tasks(&self) -> Vec<Task> {
        let mut ready: Vec<Task> = self
            .state
            .store
            .values()
            .filter(|task| task.is_pending() && self.unsatisfied_dependencies(task) == 0)
            .cloned()
            .collect();
        ready.sort_by_key(|t| t.sequence);
        ready
    }

    /// Dependencies of `task` that have not been completed
    fn unsatisfied_dependencies(&self, task: &Task) -> usize {
        task.dependencies
            .iter()
            .filter(|dep| {
                self.state
                    .store
                    .get(dep)
                    .is_none_or(|d| d.status != TaskStatus::Completed)
            })
            .count()
    }

    /// Ready tasks in priority order
    pub fn schedule_by_priority(&self) -> Vec<Task> {
        PriorityScheduler::from_tasks(self.get_ready_tasks()).into_sorted_vec()
    }

    /// Tasks matching every word of `query` as a prefix
    pub fn search_tasks(&self, query: &str) -> Vec<Task> {
        let terms = tokenize(query);
        let mut terms = terms.iter();
        let Some(first) = terms.next() else {
            return Vec::new();
        };

        let mut matches: HashSet<TaskId> = self.state.index.search(first);
        for term in terms {
            let found = self.state.index.search(term);
            matches.retain(|id| found.contains(id));
        }

        let mut tasks: Vec<Task> = matches
            .iter()
            .filter_map(|id| self.state.store.get(id))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.sequence);
        tasks
    }

    pub fn get_tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .state
            .store
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.sequence);
        tasks
    }

    pub fn get_tasks_by_tag(&self, tag: &str) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .state
            .store
            .values()
            .filter(|t| t.tags.contains(tag))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.sequence);
        tasks
    }

    /// Greedily pack ready tasks into `available_hours`
    pub fn schedule_greedy(&self, available_hours: f64) -> Result<GreedySchedule> {
        self.optimizer
            .schedule_greedy(&self.get_ready_tasks(), available_hours)
    }

    /// Minimum-total-time, dependency-respecting order of all pending tasks
    pub fn optimize_order(&self) -> Result<Vec<Task>> {
        let pending = self.get_tasks_by_status(TaskStatus::Pending);
        if pending.len() > self.optimizer.max_exact_tasks() {
            warn!(
                "Refusing exact optimization over {} pending tasks (limit {})",
                pending.len(),
                self.optimizer.max_exact_tasks()
            );
        }
        self.optimizer.optimize_order(&pending)
    }

    /// Revert the most recent mutation; `Ok(false)` if there is none
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo(&mut self.state)? {
            Some(event) => {
                self.emit_event(TaskEvent::Undone(Box::new(event)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply the most recently undone mutation; `Ok(false)` if there is none
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo(&mut self.state)? {
            Some(event) => {
                self.emit_event(TaskEvent::Redone(Box::new(event)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Add event handler
    pub fn add_event_handler(&mut self, handler: Box<dyn TaskEventHandler + Send + Sync>) {
        self.event_handlers.push(handler);
    }

    /// Export tasks and edges
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            tasks: self.get_all_tasks(),
            edges: self.dependency_edges(),
        }
    }

    /// Rebuild an engine from a snapshot, validating every edge.
    ///
    /// Dependency sets stored on the tasks are ignored and rebuilt from the
    /// edge list. History starts empty.
    pub fn from_snapshot(config: EngineConfig, snapshot: EngineSnapshot) -> Result<Self> {
        let mut manager = Self::new(config)?;
        let mut seen_sequences = HashSet::new();

        for mut task in snapshot.tasks {
            task.validate()?;
            if manager.state.store.contains(&task.id) {
                return Err(TaskError::InvalidInput(format!(
                    "duplicate task id {} in snapshot",
                    task.id
                )));
            }
            if !seen_sequences.insert(task.sequence) {
                return Err(TaskError::InvalidInput(format!(
                    "duplicate sequence {} in snapshot",
                    task.sequence
                )));
            }

            task.dependencies.clear();
            task.dependents.clear();
            let next = task.sequence.checked_add(1).ok_or_else(|| {
                TaskError::InvalidInput(format!(
                    "sequence {} of task {} leaves no room for new tasks",
                    task.sequence, task.id
                ))
            })?;
            manager.next_sequence = manager.next_sequence.max(next);
            manager.state.insert_detached(task);
        }

        for edge in &snapshot.edges {
            manager.state.link(&edge.from, &edge.to)?;
        }

        info!(
            "Restored engine with {} tasks and {} dependencies",
            manager.task_count(),
            snapshot.edges.len()
        );
        Ok(manager)
    }

    /// Export tasks and edges to JSON
    pub fn export_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// Import tasks and edges from JSON
    pub fn import_from_json(config: EngineConfig, json_data: &str) -> Result<Self> {
        let snapshot: EngineSnapshot = serde_json::from_str(json_data)?;
        Self::from_snapshot(config, snapshot)
    }

    /// Cross-check store, index and graph; empty when consistent
    pub fn validate_integrity(&self) -> Vec<String> {
        self.state.integrity_issues()
    }

    fn run(&mut self, command: Box<dyn Command>) -> Result<()> {
        let event = self.history.execute(command, &mut self.state)?;
        self.emit_event(event);
        Ok(())
    }

    /// Emit task event to all handlers
    fn emit_event(&self, event: TaskEvent) {
        for handler in &self.event_handlers {
            if let Err(e) = handler.handle_event(&event) {
                error!("Event handler error: {}", e);
            }
        }
    }
}

/// Simple event handler that logs events
pub struct LoggingEventHandler;

impl TaskEventHandler for LoggingEventHandler {
    fn handle_event(&self, event: &TaskEvent) -> anyhow::Result<()> {
        match event {
            TaskEvent::TaskCreated { task_id } => info!("Task created: {}", task_id),
            TaskEvent::TaskUpdated { task_id } => info!("Task updated: {}", task_id),
            TaskEvent::TaskDeleted { task_id } => info!("Task deleted: {}", task_id),
            TaskEvent::DependencyAdded { from, to } => {
                info!("Dependency added: {} -> {}", from, to)
            }
            TaskEvent::DependencyRemoved { from, to } => {
                info!("Dependency removed: {} -> {}", from, to)
            }
            TaskEvent::Undone(inner) => info!("Undone: {:?}", inner),
            TaskEvent::Redone(inner) => info!("Redone: {:?}", inner),
        }
        Ok(())
    }
}
