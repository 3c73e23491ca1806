use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::date::{format_date, parse_date};
use crate::error::ValidationError;

pub type MilestoneId = Uuid;

/// A local-only point-in-time marker. Never written to the shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub name: String,
    /// Stored as text; a marker whose date does not parse is simply not drawn.
    pub date: String,
}

impl Milestone {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date: format_date(date),
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }
}

/// The client's milestone list and its editing operations.
///
/// Every mutating call returns whether anything changed so the caller knows
/// when to persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneBook {
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl MilestoneBook {
    pub fn new(milestones: Vec<Milestone>) -> Self {
        Self { milestones }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter()
    }

    pub fn get(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn add(&mut self, name: &str, date: NaiveDate) -> Result<MilestoneId, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let milestone = Milestone::new(name, date);
        let id = milestone.id;
        self.milestones.push(milestone);
        Ok(id)
    }

    /// Rename; blank or unchanged names are ignored.
    pub fn rename(&mut self, id: MilestoneId, name: &str) -> bool {
        let name = name.trim();
        match self.milestones.iter_mut().find(|m| m.id == id) {
            Some(m) if !name.is_empty() && m.name != name => {
                m.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn move_to(&mut self, id: MilestoneId, date: NaiveDate) -> bool {
        let formatted = format_date(date);
        match self.milestones.iter_mut().find(|m| m.id == id) {
            Some(m) if m.date != formatted => {
                m.date = formatted;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: MilestoneId) -> bool {
        let before = self.milestones.len();
        self.milestones.retain(|m| m.id != id);
        self.milestones.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn add_rename_move_remove() {
        let mut book = MilestoneBook::default();
        let id = book.add("  SOP ", d(2025, 6, 2)).unwrap();
        assert_eq!(book.get(id).unwrap().name, "SOP");
        assert_eq!(book.get(id).unwrap().parsed_date(), Some(d(2025, 6, 2)));

        assert!(!book.rename(id, "SOP"));
        assert!(!book.rename(id, "   "));
        assert!(book.rename(id, "Start of production"));

        assert!(book.move_to(id, d(2025, 6, 9)));
        assert!(!book.move_to(id, d(2025, 6, 9)));
        assert_eq!(book.get(id).unwrap().date, "2025-06-09");

        assert!(book.remove(id));
        assert!(!book.remove(id));
        assert!(book.milestones.is_empty());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut book = MilestoneBook::default();
        assert_eq!(book.add("", d(2025, 1, 1)), Err(ValidationError::EmptyName));
    }
}
