//! Reversible engine mutations.
//!
//! Inserting a task touches the task store first, then the search index, then
//! the dependency graph; removing one (a delete, or undoing a create) goes
//! graph, index, store. All commands keep owned task snapshots rather than
//! references into live state.

use crate::error::{Result, TaskError};
use crate::task::graph::DependencyEdge;
use crate::task::history::Command;
use crate::task::manager::TaskEvent;
use crate::task::state::EngineState;
use crate::task::types::{Task, TaskId};

/// Insert a new task; undo removes it
#[derive(Debug)]
pub struct CreateTaskCommand {
    task: Task,
}

impl CreateTaskCommand {
    pub fn new(task: Task) -> Self {
        Self { task }
    }
}

impl Command for CreateTaskCommand {
    fn execute(&mut self, state: &mut EngineState) -> Result<()> {
        if state.store.contains(&self.task.id) {
            return Err(TaskError::InvalidInput(format!(
                "task {} already exists",
                self.task.id
            )));
        }
        state.insert_detached(self.task.clone());
        Ok(())
    }

    fn undo(&mut self, state: &mut EngineState) -> Result<()> {
        state.remove_with_edges(&self.task.id)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("create task {} '{}'", self.task.id, self.task.title)
    }

    fn event(&self) -> TaskEvent {
        TaskEvent::TaskCreated {
            task_id: self.task.id.clone(),
        }
    }
}

/// Replace a task's fields; stores full before/after snapshots
#[derive(Debug)]
pub struct UpdateTaskCommand {
    before: Task,
    after: Task,
}

impl UpdateTaskCommand {
    /// `after` must keep the id and dependency sets of `before`
    pub fn new(before: Task, after: Task) -> Self {
        debug_assert_eq!(before.id, after.id);
        Self { before, after }
    }

    fn replace(state: &mut EngineState, current: &Task, next: &Task) -> Result<()> {
        let live = state.task(&current.id)?;
        if live.dependencies != next.dependencies || live.dependents != next.dependents {
            return Err(TaskError::InvalidInput(format!(
                "dependencies of task {} changed since the update was recorded",
                current.id
            )));
        }

        state.store.put(next.id.clone(), next.clone());
        state.deindex_task(current);
        state.index_task(next);
        Ok(())
    }
}

impl Command for UpdateTaskCommand {
    fn execute(&mut self, state: &mut EngineState) -> Result<()> {
        Self::replace(state, &self.before, &self.after)
    }

    fn undo(&mut self, state: &mut EngineState) -> Result<()> {
        Self::replace(state, &self.after, &self.before)
    }

    fn describe(&self) -> String {
        format!("update task {}", self.after.id)
    }

    fn event(&self) -> TaskEvent {
        TaskEvent::TaskUpdated {
            task_id: self.after.id.clone(),
        }
    }
}

/// Remove a task with its index entries and edges; undo restores all three
#[derive(Debug)]
pub struct DeleteTaskCommand {
    task_id: TaskId,
    removed: Option<(Task, Vec<DependencyEdge>)>,
}

impl DeleteTaskCommand {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            removed: None,
        }
    }
}

impl Command for DeleteTaskCommand {
    fn execute(&mut self, state: &mut EngineState) -> Result<()> {
        self.removed = Some(state.remove_with_edges(&self.task_id)?);
        Ok(())
    }

    fn undo(&mut self, state: &mut EngineState) -> Result<()> {
        let (task, edges) = self
            .removed
            .take()
            .ok_or_else(|| TaskError::InvalidInput("delete was never executed".to_string()))?;
        if let Err(e) = state.restore_with_edges(task.clone(), &edges) {
            self.removed = Some((task, edges));
            return Err(e);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("delete task {}", self.task_id)
    }

    fn event(&self) -> TaskEvent {
        TaskEvent::TaskDeleted {
            task_id: self.task_id.clone(),
        }
    }
}

/// Add `from -> to`; rejected without side effects if it would close a cycle
#[derive(Debug)]
pub struct AddDependencyCommand {
    edge: DependencyEdge,
}

impl AddDependencyCommand {
    pub fn new(from: TaskId, to: TaskId) -> Self {
        Self {
            edge: DependencyEdge { from, to },
        }
    }
}

impl Command for AddDependencyCommand {
    fn execute(&mut self, state: &mut EngineState) -> Result<()> {
        if state.graph.has_edge(&self.edge.from, &self.edge.to) {
            return Err(TaskError::InvalidInput(format!(
                "dependency {} -> {} already exists",
                self.edge.from, self.edge.to
            )));
        }
        state.link(&self.edge.from, &self.edge.to)
    }

    fn undo(&mut self, state: &mut EngineState) -> Result<()> {
        if !state.unlink(&self.edge.from, &self.edge.to) {
            return Err(TaskError::InvalidInput(format!(
                "dependency {} -> {} is missing",
                self.edge.from, self.edge.to
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("add dependency {} -> {}", self.edge.from, self.edge.to)
    }

    fn event(&self) -> TaskEvent {
        TaskEvent::DependencyAdded {
            from: self.edge.from.clone(),
            to: self.edge.to.clone(),
        }
    }
}

/// Remove `from -> to`; undo re-adds it
#[derive(Debug)]
pub struct RemoveDependencyCommand {
    edge: DependencyEdge,
}

impl RemoveDependencyCommand {
    pub fn new(from: TaskId, to: TaskId) -> Self {
        Self {
            edge: DependencyEdge { from, to },
        }
    }
}

impl Command for RemoveDependencyCommand {
    fn execute(&mut self, state: &mut EngineState) -> Result<()> {
        if !state.unlink(&self.edge.from, &self.edge.to) {
            return Err(TaskError::InvalidInput(format!(
                "dependency {} -> {} does not exist",
                self.edge.from, self.edge.to
            )));
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut EngineState) -> Result<()> {
        state.link(&self.edge.from, &self.edge.to)
    }

    fn describe(&self) -> String {
        format!("remove dependency {} -> {}", self.edge.from, self.edge.to)
    }

    fn event(&self) -> TaskEvent {
        TaskEvent::DependencyRemoved {
            from: self.edge.from.clone(),
            to: self.edge.to.clone(),
        }
    }
}
