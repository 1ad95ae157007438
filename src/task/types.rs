use crate::error::{Result, TaskError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Lowest accepted priority
pub const MIN_PRIORITY: u8 = 1;
/// Highest accepted priority
pub const MAX_PRIORITY: u8 = 5;

/// Unique identifier for tasks
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random identifier
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Core task record owned by the task store
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// 1 (lowest) to 5 (highest)
    pub priority: u8,
    /// Estimated effort in hours, always positive
    pub estimated_time: f64,
    /// Hours actually spent
    pub actual_time: f64,
    pub status: TaskStatus,
    pub tags: BTreeSet<String>,
    /// Tasks this task waits on
    pub dependencies: BTreeSet<TaskId>,
    /// Tasks waiting on this task
    pub dependents: BTreeSet<TaskId>,
    /// Monotonic creation order, used for every tie-break
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Task lifecycle state
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Task has not been started
    Pending,
    /// Task is currently being worked on
    InProgress,
    /// Task finished
    Completed,
    /// Task was abandoned
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Task specification for creating new tasks
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TaskSpec {
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub estimated_time: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskSpec {
    pub fn new(title: &str, description: &str, priority: u8, estimated_time: f64) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            priority,
            estimated_time,
            tags: Vec::new(),
            assignee: None,
            deadline: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_priority(self.priority)?;
        validate_estimated_time(self.estimated_time)
    }
}

/// Field changes applied by an update; `None` leaves a field untouched
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub estimated_time: Option<f64>,
    pub actual_time: Option<f64>,
    pub status: Option<TaskStatus>,
    pub tags: Option<Vec<String>>,
    pub assignee: Option<Option<String>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(priority) = self.priority {
            validate_priority(priority)?;
        }
        if let Some(estimated) = self.estimated_time {
            validate_estimated_time(estimated)?;
        }
        if let Some(actual) = self.actual_time {
            if !(actual >= 0.0 && actual.is_finite()) {
                return Err(TaskError::InvalidInput(format!(
                    "actual time must be a non-negative number of hours, got {}",
                    actual
                )));
            }
        }
        Ok(())
    }
}

fn validate_priority(priority: u8) -> Result<()> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(TaskError::InvalidInput(format!(
            "priority must be between {} and {}, got {}",
            MIN_PRIORITY, MAX_PRIORITY, priority
        )));
    }
    Ok(())
}

fn validate_estimated_time(hours: f64) -> Result<()> {
    if !(hours > 0.0 && hours.is_finite()) {
        return Err(TaskError::InvalidInput(format!(
            "estimated time must be a positive number of hours, got {}",
            hours
        )));
    }
    Ok(())
}

impl Task {
    /// Create a new pending task with the given specification
    pub fn new(spec: TaskSpec, sequence: u64) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new_v4(),
            title: spec.title,
            description: spec.description,
            priority: spec.priority,
            estimated_time: spec.estimated_time,
            actual_time: 0.0,
            status: TaskStatus::Pending,
            tags: spec.tags.into_iter().collect(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            sequence,
            created_at: now,
            updated_at: now,
            completed_at: None,
            assignee: spec.assignee,
            deadline: spec.deadline,
        }
    }

    /// Check the numeric field invariants of a task loaded from outside
    pub fn validate(&self) -> Result<()> {
        validate_priority(self.priority)?;
        validate_estimated_time(self.estimated_time)?;
        TaskUpdate {
            actual_time: Some(self.actual_time),
            ..Default::default()
        }
        .validate()
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Priority per estimated hour, the greedy packing key
    pub fn value_density(&self) -> f64 {
        self.priority as f64 / self.estimated_time
    }

    /// Apply a validated field change set
    pub fn apply(&mut self, update: &TaskUpdate) {
        let now = Utc::now();
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(estimated) = update.estimated_time {
            self.estimated_time = estimated;
        }
        if let Some(actual) = update.actual_time {
            self.actual_time = actual;
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.iter().cloned().collect();
        }
        if let Some(assignee) = &update.assignee {
            self.assignee = assignee.clone();
        }
        if let Some(deadline) = update.deadline {
            self.deadline = deadline;
        }
        if let Some(status) = update.status {
            if status != self.status {
                self.completed_at = match status {
                    TaskStatus::Completed => Some(now),
                    _ => None,
                };
            }
            self.status = status;
        }
        self.updated_at = now;
    }

    /// All text a task is searchable by
    pub fn searchable_text(&self) -> impl Iterator<Item = &str> {
        [self.title.as_str(), self.description.as_str()]
            .into_iter()
            .chain(self.tags.iter().map(|t| t.as_str()))
    }
}
