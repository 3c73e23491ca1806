use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::date::{format_date, parse_date};
use crate::error::ValidationError;

pub type TaskId = Uuid;

/// A task as held by the shared store.
///
/// Dates stay in their stored string form: the store is loosely schema'd and
/// a task with a missing or garbled date must still load (it just gets no bar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Completion percent, 0..=100.
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: u8,
    /// Prerequisites: tasks that must complete before this one.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

/// Read whatever the store holds as a percent: rounded, clamped to 0..=100,
/// and 0 for anything that is not a number.
fn lenient_progress<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let percent = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(percent
        .filter(|p| p.is_finite())
        .map_or(0, |p| p.round().clamp(0.0, 100.0) as u8))
}

impl Task {
    /// Create a new task with sensible defaults.
    pub fn new(title: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            start: Some(format_date(start)),
            end: Some(format_date(end)),
            progress: 0,
            dependencies: Vec::new(),
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start.as_deref().and_then(parse_date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end.as_deref().and_then(parse_date)
    }

    /// Both dates, when both parse.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start_date()?, self.end_date()?))
    }

    pub fn depends_on(&self, other: TaskId) -> bool {
        self.dependencies.contains(&other)
    }

    /// ISO calendar-week label for the task list ("KW 03", "KW 03 – 05").
    pub fn week_label(&self) -> String {
        match self.date_span() {
            Some((s, e)) => {
                let sw = s.iso_week().week();
                let ew = e.iso_week().week();
                if sw == ew {
                    format!("KW {sw:02}")
                } else {
                    format!("KW {sw:02} – {ew:02}")
                }
            }
            None => "No date".to_string(),
        }
    }

    /// Apply a partial update in place, as the store does.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(start) = patch.start {
            self.start = Some(format_date(start));
        }
        if let Some(end) = patch.end {
            self.end = Some(format_date(end));
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.min(100);
        }
    }
}

/// Partial field update sent through the mutation port.
///
/// Only the fields a gesture actually changed are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_date"
    )]
    pub start: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_date"
    )]
    pub end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl TaskPatch {
    pub fn dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn start(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            ..Default::default()
        }
    }

    pub fn end(end: NaiveDate) -> Self {
        Self {
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start.is_none() && self.end.is_none() && self.progress.is_none()
    }

    /// Reject patches that would leave the task with `end < start`.
    pub fn validate_against(&self, task: &Task) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
        }
        let start = self.start.or_else(|| task.start_date());
        let end = self.end.or_else(|| task.end_date());
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(ValidationError::EndBeforeStart {
                    start: format_date(s),
                    end: format_date(e),
                });
            }
        }
        Ok(())
    }
}

/// Fields for a task created from the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.end < self.start {
            return Err(ValidationError::EndBeforeStart {
                start: format_date(self.start),
                end: format_date(self.end),
            });
        }
        Ok(())
    }

    pub fn into_task(self) -> Task {
        Task::new(self.title.trim(), self.start, self.end)
    }
}

/// Serde helper for optional `%Y-%m-%d` dates.
mod opt_date {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use crate::model::date::{format_date, parse_date};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&format_date(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) => parse_date(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{s}'"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn garbled_dates_do_not_break_loading() {
        let json = r#"{"id":"6f1c1c3e-8a55-4d44-9c59-3f7b9d1c2a10","title":"Fit-out","start":"soon","progress":40}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.start_date(), None);
        assert_eq!(task.end, None);
        assert_eq!(task.date_span(), None);
        assert_eq!(task.progress, 40);
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn odd_progress_values_still_load() {
        let cases = [
            ("250", 100),
            ("-5", 0),
            ("37.6", 38),
            ("\"55\"", 55),
            ("null", 0),
            ("true", 0),
        ];
        for (raw, expected) in cases {
            let json = format!(
                r#"{{"id":"6f1c1c3e-8a55-4d44-9c59-3f7b9d1c2a10","title":"x","progress":{raw}}}"#
            );
            let task: Task = serde_json::from_str(&json).unwrap();
            assert_eq!(task.progress, expected, "progress {raw}");
        }
    }

    #[test]
    fn week_labels() {
        let same = Task::new("a", d(2025, 1, 13), d(2025, 1, 17));
        assert_eq!(same.week_label(), "KW 03");
        let spread = Task::new("b", d(2025, 1, 13), d(2025, 1, 28));
        assert_eq!(spread.week_label(), "KW 03 – 05");
        let mut undated = same.clone();
        undated.end = None;
        assert_eq!(undated.week_label(), "No date");
    }

    #[test]
    fn patch_serializes_only_changed_fields() {
        let json = serde_json::to_string(&TaskPatch::end(d(2025, 1, 14))).unwrap();
        assert_eq!(json, r#"{"end":"2025-01-14"}"#);
    }

    #[test]
    fn apply_patch_clamps_progress() {
        let mut task = Task::new("a", d(2025, 1, 1), d(2025, 1, 2));
        task.apply(&TaskPatch::progress(140));
        assert_eq!(task.progress, 100);
        task.apply(&TaskPatch::start(d(2024, 12, 30)));
        assert_eq!(task.start.as_deref(), Some("2024-12-30"));
    }

    #[test]
    fn patch_validation_catches_inverted_range() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        assert!(TaskPatch::end(d(2025, 1, 10)).validate_against(&task).is_ok());
        assert!(matches!(
            TaskPatch::end(d(2025, 1, 9)).validate_against(&task),
            Err(ValidationError::EndBeforeStart { .. })
        ));
        assert_eq!(
            TaskPatch::title("  ").validate_against(&task),
            Err(ValidationError::EmptyName)
        );
    }

    #[test]
    fn new_task_validation() {
        let ok = NewTask {
            title: "Survey".into(),
            start: d(2025, 2, 1),
            end: d(2025, 2, 1),
        };
        assert!(ok.validate().is_ok());
        let bad = NewTask {
            end: d(2025, 1, 31),
            ..ok.clone()
        };
        assert!(bad.validate().is_err());
        let unnamed = NewTask {
            title: " ".into(),
            ..ok
        };
        assert_eq!(unnamed.validate(), Err(ValidationError::EmptyName));
    }
}
