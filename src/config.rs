//! Persisted planner settings (lives in the OS config directory).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::model::ViewMode;

const APP_NAME: &str = "PlannerTimeline";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub start_year: i32,
    pub end_year: i32,
    pub mode: ViewMode,
    /// Pixels per day in the annual view.
    pub day_width: f32,
    /// Pixels per day used when switching to the monthly view.
    pub monthly_day_width: f32,
    pub row_height: f32,
    pub show_today_line: bool,
    /// Refuse every task edit from this client.
    pub read_only: bool,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Where the task store snapshot is kept. Defaults to the data directory.
    pub store_path: Option<PathBuf>,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            start_year: 2025,
            end_year: 2026,
            mode: ViewMode::Annual,
            day_width: 18.0,
            monthly_day_width: 40.0,
            row_height: 30.0,
            show_today_line: true,
            read_only: false,
            log_level: "info".into(),
            store_path: None,
        }
    }
}

impl PlannerSettings {
    /// Load settings, falling back to defaults for a missing or broken file.
    /// A default file is written on first run so users have something to edit.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %path.display(), %e, "ignoring malformed settings");
                    Self::default()
                }
            },
            Err(_) => {
                let settings = Self::default();
                match settings.save(path) {
                    Ok(()) => info!(path = %path.display(), "wrote default settings"),
                    Err(e) => warn!(%e, "could not write default settings"),
                }
                settings
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| StorageError::json(path, e))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        std::fs::write(path, json).map_err(|e| StorageError::io(path, e))
    }

    /// The configured store path, or `tasks.json` in the data directory.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| data_dir().join("tasks.json"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

pub fn settings_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().join("settings.json"),
        None => PathBuf::from(".").join("settings.json"),
    }
}

pub fn data_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        // Fallback
        None => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("settings.json");
        let settings = PlannerSettings::load_or_default(&path);
        assert_eq!(settings, PlannerSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "read_only": true, "mode": "monthly" }"#).unwrap();
        let settings = PlannerSettings::load_or_default(&path);
        assert!(settings.read_only);
        assert_eq!(settings.mode, ViewMode::Monthly);
        assert_eq!(settings.day_width, 18.0);
        assert_eq!(settings.end_year, 2026);
    }

    #[test]
    fn explicit_store_path_wins() {
        let settings = PlannerSettings {
            store_path: Some(PathBuf::from("/tmp/plan.json")),
            ..Default::default()
        };
        assert_eq!(settings.resolved_store_path(), PathBuf::from("/tmp/plan.json"));
    }
}
