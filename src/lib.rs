//! Gantt timeline core for the planner: date grid, layout, drag and
//! dependency-link interaction, and the task store port they write through.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod interaction;
pub mod io;
pub mod logging;
pub mod model;
pub mod planner;
pub mod store;

pub use error::{MutationError, RangeError, StorageError, ValidationError};
pub use planner::PlannerState;
