use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::data_dir;
use crate::error::StorageError;
use crate::model::MilestoneBook;

/// Local milestone file, saved as `{ "milestones": [...] }`.
#[derive(Debug, Clone)]
pub struct MilestoneStore {
    path: PathBuf,
}

impl MilestoneStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `milestones.json` in the per-user data directory.
    pub fn default_location() -> Self {
        Self::new(data_dir().join("milestones.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file means no milestones yet.
    pub fn load(&self) -> Result<MilestoneBook, StorageError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MilestoneBook::default())
            }
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        serde_json::from_str(&json).map_err(|e| StorageError::json(&self.path, e))
    }

    pub fn save(&self, book: &MilestoneBook) -> Result<(), StorageError> {
        let json =
            serde_json::to_string_pretty(book).map_err(|e| StorageError::json(&self.path, e))?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        std::fs::write(&self.path, json).map_err(|e| StorageError::io(&self.path, e))?;
        debug!(path = %self.path.display(), count = book.milestones.len(), "milestones saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn book_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = MilestoneStore::new(dir.path().join("milestones.json"));
        assert_eq!(store.load().unwrap(), MilestoneBook::default());

        let mut book = MilestoneBook::default();
        book.add("Go live", NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
            .unwrap();
        store.save(&book).unwrap();
        assert_eq!(store.load().unwrap(), book);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["milestones"][0]["date"], "2025-06-30");
    }
}
