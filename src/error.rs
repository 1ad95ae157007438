use crate::task::types::TaskId;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the task engine.
///
/// Every failing operation leaves the store, search index and dependency
/// graph exactly as they were before the call.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Dependency {from} -> {to} would create a cycle")]
    Cycle { from: TaskId, to: TaskId },

    #[error("Dependency graph contains a cycle")]
    CycleDetected,

    #[error("Task cannot depend on itself: {0}")]
    SelfDependency(TaskId),

    #[error("Too many tasks for exact optimization: {count} (limit {limit})")]
    TooManyTasks { count: usize, limit: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl TaskError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            TaskError::NotFound(_) => "TASK_NOT_FOUND",
            TaskError::Cycle { .. } => "CIRCULAR_DEPENDENCY",
            TaskError::CycleDetected => "CYCLE_DETECTED",
            TaskError::SelfDependency(_) => "SELF_DEPENDENCY",
            TaskError::TooManyTasks { .. } => "TOO_MANY_TASKS",
            TaskError::InvalidInput(_) => "INVALID_INPUT",
            TaskError::Config(_) => "CONFIG_ERROR",
            TaskError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let id = TaskId::from("abc");
        assert_eq!(TaskError::NotFound(id.clone()).to_error_code(), "TASK_NOT_FOUND");
        assert_eq!(
            TaskError::Cycle {
                from: id.clone(),
                to: id.clone()
            }
            .to_error_code(),
            "CIRCULAR_DEPENDENCY"
        );
        assert_eq!(
            TaskError::TooManyTasks {
                count: 30,
                limit: 20
            }
            .to_error_code(),
            "TOO_MANY_TASKS"
        );
    }

    #[test]
    fn test_error_response_carries_message() {
        let response = TaskError::NotFound(TaskId::from("missing")).to_error_response();
        assert_eq!(response.code, "TASK_NOT_FOUND");
        assert!(response.error.contains("missing"));
    }
}
