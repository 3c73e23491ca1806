//! Pure timeline layout: task bars, dependency arrows and milestone markers
//! computed from the task list and a [`DateGrid`]. No painting happens here.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use super::milestone::{Milestone, MilestoneId};
use super::task::{Task, TaskId};
use super::timeline::DateGrid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Where a task sits on the grid. Day indices are unclamped, so they may fall
/// outside the visible range for a partially visible task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPosition {
    pub task_id: TaskId,
    pub start_day: i64,
    pub end_day: i64,
    pub row: usize,
}

/// A drawable bar, clipped to the visible range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBar {
    pub task_id: TaskId,
    pub row: usize,
    pub start_index: i64,
    pub end_index: i64,
    /// Columns covered; never below 1.
    pub span: i64,
    pub progress: u8,
    pub clipped_start: bool,
    pub clipped_end: bool,
}

impl TaskBar {
    /// Left edge and width in pixels.
    pub fn x_extent(&self, grid: &DateGrid) -> (f32, f32) {
        (
            grid.index_to_pixel(self.start_index),
            grid.index_to_pixel(self.span),
        )
    }
}

/// Orthogonal connector from a prerequisite's right edge to its dependent's
/// left edge: horizontal, vertical, horizontal.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyArrow {
    pub prerequisite: TaskId,
    pub dependent: TaskId,
    pub points: [Point; 4],
    /// The dependent starts before its prerequisite has finished. Display only.
    pub warning: bool,
}

impl DependencyArrow {
    /// Anchor for the remove control: the bend on the dependent's row.
    pub fn handle_point(&self) -> Point {
        self.points[2]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneMarker {
    pub milestone_id: MilestoneId,
    pub index: i64,
    pub x: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineLayout {
    pub positions: HashMap<TaskId, TaskPosition>,
    pub bars: Vec<TaskBar>,
    pub arrows: Vec<DependencyArrow>,
    pub milestones: Vec<MilestoneMarker>,
    /// Number of task rows, including tasks that produced no bar.
    pub rows: usize,
}

impl TimelineLayout {
    pub fn bar(&self, task_id: TaskId) -> Option<&TaskBar> {
        self.bars.iter().find(|b| b.task_id == task_id)
    }

    pub fn marker(&self, milestone_id: MilestoneId) -> Option<&MilestoneMarker> {
        self.milestones
            .iter()
            .find(|m| m.milestone_id == milestone_id)
    }
}

/// Lays tasks out one per row in list order. No packing: the caller sorts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayoutEngine {
    pub row_height: f32,
}

impl Default for TimelineLayoutEngine {
    fn default() -> Self {
        Self { row_height: 30.0 }
    }
}

impl TimelineLayoutEngine {
    pub fn new(row_height: f32) -> Self {
        Self { row_height }
    }

    /// Vertical centre of a row.
    pub fn row_center(&self, row: usize) -> f32 {
        row as f32 * self.row_height + self.row_height / 2.0
    }

    pub fn layout(&self, tasks: &[Task], milestones: &[Milestone], grid: &DateGrid) -> TimelineLayout {
        let mut out = TimelineLayout {
            rows: tasks.len(),
            ..Default::default()
        };

        for (row, task) in tasks.iter().enumerate() {
            if let Some(bar) = self.place(task, row, grid, &mut out.positions) {
                out.bars.push(bar);
            }
        }

        for dependent in tasks {
            let Some(to) = out.positions.get(&dependent.id) else {
                continue;
            };
            for prereq_id in &dependent.dependencies {
                if let Some(from) = out.positions.get(prereq_id) {
                    out.arrows.push(self.route(from, to, grid));
                }
            }
        }

        out.milestones = milestones
            .iter()
            .filter_map(|m| {
                let date = m.parsed_date()?;
                if !grid.range().contains(date) {
                    return None;
                }
                let index = grid.date_to_index(date);
                Some(MilestoneMarker {
                    milestone_id: m.id,
                    index,
                    x: grid.index_to_pixel(index),
                })
            })
            .collect();

        out
    }

    fn place(
        &self,
        task: &Task,
        row: usize,
        grid: &DateGrid,
        positions: &mut HashMap<TaskId, TaskPosition>,
    ) -> Option<TaskBar> {
        let Some((start, end)) = task.date_span() else {
            debug!(task = %task.id, "no bar: missing or unparseable dates");
            return None;
        };
        let range = grid.range();
        if !range.overlaps(start, end) {
            return None;
        }

        let start_index = grid.date_to_index(range.clamp(start));
        let end_index = grid.date_to_index(range.clamp(end));
        positions.insert(
            task.id,
            TaskPosition {
                task_id: task.id,
                start_day: grid.date_to_index(start),
                end_day: grid.date_to_index(end),
                row,
            },
        );

        Some(TaskBar {
            task_id: task.id,
            row,
            start_index,
            end_index,
            span: (end_index - start_index + 1).max(1),
            progress: task.progress.min(100),
            clipped_start: start < range.start(),
            clipped_end: end > range.end(),
        })
    }

    fn route(&self, from: &TaskPosition, to: &TaskPosition, grid: &DateGrid) -> DependencyArrow {
        let x1 = grid.index_to_pixel(from.end_day + 1);
        let y1 = self.row_center(from.row);
        let x2 = grid.index_to_pixel(to.start_day);
        let y2 = self.row_center(to.row);
        let mid_x = x1 + grid.day_width() / 2.0;

        DependencyArrow {
            prerequisite: from.task_id,
            dependent: to.task_id,
            points: [
                Point::new(x1, y1),
                Point::new(mid_x, y1),
                Point::new(mid_x, y2),
                Point::new(x2, y2),
            ],
            warning: to.start_day <= from.end_day,
        }
    }
}

/// Column for the "today" line, if today is visible.
pub fn today_index(grid: &DateGrid, today: NaiveDate) -> Option<i64> {
    grid.range()
        .contains(today)
        .then(|| grid.date_to_index(today))
}
