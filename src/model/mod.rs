pub mod date;
pub mod header;
pub mod layout;
pub mod milestone;
pub mod task;
pub mod timeline;

pub use header::{HeaderSegment, HeaderTracks};
pub use layout::{
    today_index, DependencyArrow, MilestoneMarker, Point, TaskBar, TaskPosition, TimelineLayout,
    TimelineLayoutEngine,
};
pub use milestone::{Milestone, MilestoneBook, MilestoneId};
pub use task::{NewTask, Task, TaskId, TaskPatch};
pub use timeline::{DateGrid, GridDay, ViewMode, ViewRange, Viewport};
