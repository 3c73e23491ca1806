use std::path::PathBuf;

use thiserror::Error;

use crate::model::TaskId;

/// A write rejected by the task store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("read-only mode: tasks cannot be modified")]
    PermissionDenied,
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),
    #[error("store unavailable: {0}")]
    Backend(String),
}

/// Field-level validation failures for task and milestone input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a name is required")]
    EmptyName,
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: String, end: String },
    #[error("a task cannot depend on itself")]
    SelfDependency,
}

/// Problems building a visible date range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range start {start} is after range end {end}")]
    Inverted { start: String, end: String },
    #[error("no such calendar month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Local file persistence failures (settings, milestones, task snapshots).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
