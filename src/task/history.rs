use crate::error::Result;
use crate::task::manager::TaskEvent;
use crate::task::state::EngineState;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// A reversible mutation of the engine state.
///
/// Implementations hold owned snapshots of whatever they need to undo, never
/// references into the live state. `execute` is also used for redo, so it
/// must be repeatable after a matching `undo`.
pub trait Command: fmt::Debug + Send {
    fn execute(&mut self, state: &mut EngineState) -> Result<()>;

    fn undo(&mut self, state: &mut EngineState) -> Result<()>;

    /// Short human-readable summary for logs
    fn describe(&self) -> String;

    /// Event reported to handlers once the command has been applied
    fn event(&self) -> TaskEvent;
}

/// Bounded undo stack plus redo stack
#[derive(Debug)]
pub struct CommandHistory {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    capacity: usize,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Run a command and record it; a failed command is not recorded and
    /// leaves the redo stack untouched.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        state: &mut EngineState,
    ) -> Result<TaskEvent> {
        command.execute(state)?;
        let event = command.event();
        debug!("Executed {}", command.describe());

        self.undo_stack.push_back(command);
        if self.undo_stack.len() > self.capacity {
            if let Some(evicted) = self.undo_stack.pop_front() {
                debug!("History full, dropped {}", evicted.describe());
            }
        }
        self.redo_stack.clear();
        Ok(event)
    }

    /// Undo the most recent command; `Ok(None)` when there is nothing to undo
    pub fn undo(&mut self, state: &mut EngineState) -> Result<Option<TaskEvent>> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(None);
        };

        if let Err(e) = command.undo(state) {
            warn!("Undo of {} failed: {}", command.describe(), e);
            self.undo_stack.push_back(command);
            return Err(e);
        }

        debug!("Undid {}", command.describe());
        let event = command.event();
        self.redo_stack.push(command);
        Ok(Some(event))
    }

    /// Re-apply the most recently undone command; `Ok(None)` when there is nothing to redo
    pub fn redo(&mut self, state: &mut EngineState) -> Result<Option<TaskEvent>> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(None);
        };

        if let Err(e) = command.execute(state) {
            warn!("Redo of {} failed: {}", command.describe(), e);
            self.redo_stack.push(command);
            return Err(e);
        }

        debug!("Redid {}", command.describe());
        let event = command.event();
        self.undo_stack.push_back(command);
        Ok(Some(event))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

}
