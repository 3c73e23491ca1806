pub mod file;
pub mod milestones;
