use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::StorageError;
use crate::model::Task;

/// On-disk shape of a task store snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskSnapshot {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Save tasks to a JSON file.
pub fn save_tasks(tasks: &[Task], path: &Path) -> Result<(), StorageError> {
    let snapshot = TaskSnapshot {
        tasks: tasks.to_vec(),
    };
    let json = serde_json::to_string_pretty(&snapshot).map_err(|e| StorageError::json(path, e))?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    }
    std::fs::write(path, json).map_err(|e| StorageError::io(path, e))
}

/// Load tasks from a JSON file. A missing file is an empty store.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, StorageError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    let snapshot: TaskSnapshot =
        serde_json::from_str(&json).map_err(|e| StorageError::json(path, e))?;
    Ok(snapshot.tasks)
}
