//! Pointer-drag gestures on task bars and milestone markers.
//!
//! A gesture only ever changes a preview. Releasing the pointer turns the
//! preview into a [`PendingCommit`] for the caller to send through the
//! mutation port; the preview stays up while the write is in flight and is
//! dropped on rejection so the bar snaps back to the stored state.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::MutationError;
use crate::model::date::add_days;
use crate::model::{DateGrid, MilestoneId, Task, TaskId, TaskPatch};

/// Decides whether the current user may edit a task.
pub trait EditCapability {
    fn can_edit(&self, task: &Task) -> bool;
}

impl<F> EditCapability for F
where
    F: Fn(&Task) -> bool,
{
    fn can_edit(&self, task: &Task) -> bool {
        self(task)
    }
}

/// Which part of a bar the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragKind {
    /// Bar body: shift both dates.
    Move,
    /// Left handle: shift the start date only.
    ResizeStart,
    /// Right handle: shift the end date only.
    ResizeEnd,
    /// Progress knob: set completion percent.
    Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    Committing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("read-only mode: tasks cannot be modified")]
    NotEditable,
    #[error("task has no valid dates to drag")]
    Undated,
    #[error("another drag is already in progress")]
    Busy,
    #[error("nothing to drag at this position")]
    NotOnTimeline,
}

/// A finished task gesture waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    pub ticket: CommitTicket,
    pub task_id: TaskId,
    pub patch: TaskPatch,
}

/// What a pointer-up produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragRelease {
    Task(PendingCommit),
    /// Milestones live on the client; the caller applies and saves this directly.
    Milestone {
        milestone_id: MilestoneId,
        date: NaiveDate,
    },
}

#[derive(Debug, Clone)]
struct TaskDrag {
    task_id: TaskId,
    kind: DragKind,
    origin_x: f32,
    start: NaiveDate,
    end: NaiveDate,
    bar_left: f32,
    bar_width: f32,
    preview: TaskPatch,
}

#[derive(Debug, Clone)]
struct MilestoneDrag {
    milestone_id: MilestoneId,
    origin_x: f32,
    marker_x: f32,
    offset: f32,
}

#[derive(Debug, Clone)]
enum Gesture {
    Idle,
    Task(TaskDrag),
    Milestone(MilestoneDrag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreviewStatus {
    Live,
    InFlight(CommitTicket),
    /// Written; waiting for the change feed to catch up.
    Settled,
}

#[derive(Debug, Clone)]
struct Preview {
    patch: TaskPatch,
    status: PreviewStatus,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    task_id: TaskId,
    snapshot_generation: u64,
}

pub struct DragInteractionController {
    capability: Box<dyn EditCapability>,
    gesture: Gesture,
    previews: HashMap<TaskId, Preview>,
    in_flight: HashMap<CommitTicket, InFlight>,
    next_ticket: u64,
    snapshot_generation: u64,
}

impl DragInteractionController {
    pub fn new(capability: impl EditCapability + 'static) -> Self {
        Self {
            capability: Box::new(capability),
            gesture: Gesture::Idle,
            previews: HashMap::new(),
            in_flight: HashMap::new(),
            next_ticket: 0,
            snapshot_generation: 0,
        }
    }

    pub fn can_edit(&self, task: &Task) -> bool {
        self.capability.can_edit(task)
    }

    pub fn phase(&self) -> DragPhase {
        match self.gesture {
            Gesture::Task(_) | Gesture::Milestone(_) => DragPhase::Dragging,
            Gesture::Idle if !self.in_flight.is_empty() => DragPhase::Committing,
            Gesture::Idle => DragPhase::Idle,
        }
    }

    /// The task under an active gesture, if any.
    pub fn dragged_task(&self) -> Option<(TaskId, DragKind)> {
        match &self.gesture {
            Gesture::Task(drag) => Some((drag.task_id, drag.kind)),
            _ => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start a gesture on `task` as currently displayed.
    ///
    /// `bar_left`/`bar_width` are the bar's pixel extent in the same
    /// coordinate space as `pointer_x`.
    pub fn pointer_down(
        &mut self,
        task: &Task,
        kind: DragKind,
        pointer_x: f32,
        bar_left: f32,
        bar_width: f32,
    ) -> Result<(), DragError> {
        if !matches!(self.gesture, Gesture::Idle) {
            return Err(DragError::Busy);
        }
        if !self.capability.can_edit(task) {
            return Err(DragError::NotEditable);
        }
        let (start, end) = task.date_span().ok_or(DragError::Undated)?;

        let preview = match kind {
            DragKind::Move => TaskPatch::dates(start, end),
            DragKind::ResizeStart => TaskPatch::start(start),
            DragKind::ResizeEnd => TaskPatch::end(end),
            DragKind::Progress => TaskPatch::progress(task.progress.min(100)),
        };
        debug!(task = %task.id, ?kind, "drag started");
        self.previews.insert(
            task.id,
            Preview {
                patch: preview.clone(),
                status: PreviewStatus::Live,
            },
        );
        self.gesture = Gesture::Task(TaskDrag {
            task_id: task.id,
            kind,
            origin_x: pointer_x,
            start,
            end,
            bar_left,
            bar_width,
            preview,
        });
        Ok(())
    }

    /// Start dragging a milestone marker currently drawn at `marker_x`.
    pub fn milestone_down(
        &mut self,
        milestone_id: MilestoneId,
        pointer_x: f32,
        marker_x: f32,
    ) -> Result<(), DragError> {
        if !matches!(self.gesture, Gesture::Idle) {
            return Err(DragError::Busy);
        }
        self.gesture = Gesture::Milestone(MilestoneDrag {
            milestone_id,
            origin_x: pointer_x,
            marker_x,
            offset: 0.0,
        });
        Ok(())
    }

    /// Update the preview for the current pointer position.
    pub fn pointer_move(&mut self, pointer_x: f32, grid: &DateGrid) {
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Milestone(drag) => drag.offset = pointer_x - drag.origin_x,
            Gesture::Task(drag) => {
                drag.preview = task_preview(drag, pointer_x, grid);
                if let Some(p) = self.previews.get_mut(&drag.task_id) {
                    p.patch = drag.preview.clone();
                }
            }
        }
    }

    /// End the gesture. Always terminates it, committing the last preview.
    pub fn pointer_up(&mut self, grid: &DateGrid) -> Option<DragRelease> {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => None,
            Gesture::Milestone(drag) => {
                let index = (drag.marker_x + drag.offset) / grid.day_width();
                let index = grid.clamp_index(index.round() as i64);
                Some(DragRelease::Milestone {
                    milestone_id: drag.milestone_id,
                    date: grid.index_to_date(index),
                })
            }
            Gesture::Task(drag) => {
                let ticket = CommitTicket(self.next_ticket);
                self.next_ticket += 1;
                self.in_flight.insert(
                    ticket,
                    InFlight {
                        task_id: drag.task_id,
                        snapshot_generation: self.snapshot_generation,
                    },
                );
                self.previews.insert(
                    drag.task_id,
                    Preview {
                        patch: drag.preview.clone(),
                        status: PreviewStatus::InFlight(ticket),
                    },
                );
                debug!(task = %drag.task_id, ?ticket, "drag released");
                Some(DragRelease::Task(PendingCommit {
                    ticket,
                    task_id: drag.task_id,
                    patch: drag.preview,
                }))
            }
        }
    }

    /// Abandon the gesture without committing anything.
    pub fn cancel(&mut self) {
        if let Gesture::Task(drag) = std::mem::replace(&mut self.gesture, Gesture::Idle) {
            if matches!(
                self.previews.get(&drag.task_id).map(|p| p.status),
                Some(PreviewStatus::Live)
            ) {
                self.previews.remove(&drag.task_id);
            }
        }
    }

    /// Record how a commit went. A rejection drops the preview so the bar
    /// reverts to the last stored state; the error is handed back for the
    /// caller to surface.
    pub fn finish(
        &mut self,
        ticket: CommitTicket,
        result: Result<(), MutationError>,
    ) -> Result<(), MutationError> {
        let Some(flight) = self.in_flight.remove(&ticket) else {
            return result;
        };
        let owns_preview = matches!(
            self.previews.get(&flight.task_id).map(|p| p.status),
            Some(PreviewStatus::InFlight(t)) if t == ticket
        );

        match &result {
            Err(err) => {
                warn!(task = %flight.task_id, %err, "commit rejected; reverting preview");
                if owns_preview {
                    self.previews.remove(&flight.task_id);
                }
            }
            Ok(()) if owns_preview => {
                if self.snapshot_generation > flight.snapshot_generation {
                    self.previews.remove(&flight.task_id);
                } else if let Some(p) = self.previews.get_mut(&flight.task_id) {
                    p.status = PreviewStatus::Settled;
                }
            }
            Ok(()) => {}
        }
        result
    }

    /// A fresh task list arrived from the store.
    pub fn on_snapshot(&mut self, tasks: &[Task]) {
        self.snapshot_generation += 1;
        self.previews
            .retain(|_, p| p.status != PreviewStatus::Settled);

        let vanished = match &self.gesture {
            Gesture::Task(drag) => !tasks.iter().any(|t| t.id == drag.task_id),
            _ => false,
        };
        if vanished {
            debug!("dragged task vanished; cancelling");
            self.cancel();
        }
    }

    /// Pending visual changes, to be laid over the stored tasks.
    pub fn previews(&self) -> impl Iterator<Item = (TaskId, &TaskPatch)> {
        self.previews.iter().map(|(id, p)| (*id, &p.patch))
    }

    pub fn preview_for(&self, task_id: TaskId) -> Option<&TaskPatch> {
        self.previews.get(&task_id).map(|p| &p.patch)
    }

    /// Horizontal pixel offset of a milestone being dragged.
    pub fn milestone_offset(&self) -> Option<(MilestoneId, f32)> {
        match &self.gesture {
            Gesture::Milestone(drag) => Some((drag.milestone_id, drag.offset)),
            _ => None,
        }
    }
}

fn task_preview(drag: &TaskDrag, pointer_x: f32, grid: &DateGrid) -> TaskPatch {
    let delta_days = grid.delta_days(pointer_x - drag.origin_x);
    let range = grid.range();
    // Every preview keeps at least one day of the bar on the grid.
    match drag.kind {
        DragKind::Move => {
            let earliest = -grid.date_to_index(drag.end);
            let latest = grid.last_index() - grid.date_to_index(drag.start);
            let delta_days = delta_days.min(latest).max(earliest);
            TaskPatch::dates(
                add_days(drag.start, delta_days),
                add_days(drag.end, delta_days),
            )
        }
        DragKind::ResizeStart => TaskPatch::start(
            add_days(drag.start, delta_days)
                .min(drag.end)
                .min(range.end()),
        ),
        DragKind::ResizeEnd => TaskPatch::end(
            add_days(drag.end, delta_days)
                .max(drag.start)
                .max(range.start()),
        ),
        DragKind::Progress => TaskPatch::progress(progress_at(
            pointer_x,
            drag.bar_left,
            drag.bar_width,
        )),
    }
}

/// Percent of the bar left of the pointer, rounded and clamped to 0..=100.
pub fn progress_at(pointer_x: f32, bar_left: f32, bar_width: f32) -> u8 {
    if bar_width <= 0.0 || !pointer_x.is_finite() {
        return 0;
    }
    ((pointer_x - bar_left) / bar_width * 100.0)
        .round()
        .clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViewRange;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn grid() -> DateGrid {
        DateGrid::new(ViewRange::monthly(2025, 1).unwrap(), 20.0)
    }

    fn editable() -> DragInteractionController {
        DragInteractionController::new(|_: &Task| true)
    }

    fn commit(release: Option<DragRelease>) -> PendingCommit {
        match release {
            Some(DragRelease::Task(c)) => c,
            other => panic!("expected task commit, got {other:?}"),
        }
    }

    #[test]
    fn move_preserves_span() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 200.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(141.0, &grid());
        assert_eq!(ctl.phase(), DragPhase::Dragging);
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::dates(d(2025, 1, 7), d(2025, 1, 9)));
        assert_eq!(ctl.phase(), DragPhase::Committing);
    }

    #[test]
    fn move_stops_at_the_grid_edges() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 190.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(990.0, &grid());
        assert_eq!(
            ctl.preview_for(task.id),
            Some(&TaskPatch::dates(d(2025, 1, 31), d(2025, 2, 2)))
        );
        ctl.pointer_move(-2_000.0, &grid());
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::dates(d(2024, 12, 30), d(2025, 1, 1)));
    }

    #[test]
    fn resizes_stay_on_the_grid() {
        let task = Task::new("a", d(2024, 12, 20), d(2025, 2, 10));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::ResizeStart, 0.0, 0.0, 620.0).unwrap();
        ctl.pointer_move(5_000.0, &grid());
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::start(d(2025, 1, 31)));

        ctl.finish(c.ticket, Ok(())).unwrap();
        ctl.pointer_down(&task, DragKind::ResizeEnd, 620.0, 0.0, 620.0).unwrap();
        ctl.pointer_move(-5_000.0, &grid());
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::end(d(2025, 1, 1)));
    }

    #[test]
    fn resize_start_never_passes_end() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::ResizeStart, 180.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(500.0, &grid());
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::start(d(2025, 1, 12)));
    }

    #[test]
    fn resize_end_before_start_commits_end_equal_start() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::ResizeEnd, 240.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(-400.0, &grid());
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::end(d(2025, 1, 10)));
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress_at(150.0, 100.0, 100.0), 50);
        assert_eq!(progress_at(0.0, 100.0, 100.0), 0);
        assert_eq!(progress_at(900.0, 100.0, 100.0), 100);
        assert_eq!(progress_at(150.0, 100.0, 0.0), 0);

        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Progress, 190.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(1_000.0, &grid());
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::progress(100));
    }

    #[test]
    fn release_without_movement_still_commits() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::ResizeEnd, 240.0, 180.0, 60.0).unwrap();
        let c = commit(ctl.pointer_up(&grid()));
        assert_eq!(c.patch, TaskPatch::end(d(2025, 1, 12)));
    }

    #[test]
    fn read_only_tasks_cannot_be_dragged() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = DragInteractionController::new(|_: &Task| false);
        assert_eq!(
            ctl.pointer_down(&task, DragKind::Move, 0.0, 0.0, 60.0),
            Err(DragError::NotEditable)
        );
        assert_eq!(ctl.phase(), DragPhase::Idle);
        assert!(ctl.pointer_up(&grid()).is_none());
    }

    #[test]
    fn undated_tasks_cannot_be_dragged() {
        let mut task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        task.end = Some("whenever".into());
        let mut ctl = editable();
        assert_eq!(
            ctl.pointer_down(&task, DragKind::Move, 0.0, 0.0, 60.0),
            Err(DragError::Undated)
        );
    }

    #[test]
    fn rejection_drops_preview() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 0.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(40.0, &grid());
        let c = commit(ctl.pointer_up(&grid()));
        assert!(ctl.preview_for(task.id).is_some());

        let err = MutationError::Backend("offline".into());
        assert_eq!(ctl.finish(c.ticket, Err(err.clone())), Err(err));
        assert!(ctl.preview_for(task.id).is_none());
        assert_eq!(ctl.phase(), DragPhase::Idle);
    }

    #[test]
    fn success_before_snapshot_waits_for_feed() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 0.0, 180.0, 60.0).unwrap();
        let c = commit(ctl.pointer_up(&grid()));
        ctl.finish(c.ticket, Ok(())).unwrap();
        assert!(ctl.preview_for(task.id).is_some());
        ctl.on_snapshot(&[task.clone()]);
        assert!(ctl.preview_for(task.id).is_none());
    }

    #[test]
    fn success_after_snapshot_clears_immediately() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 0.0, 180.0, 60.0).unwrap();
        let c = commit(ctl.pointer_up(&grid()));
        ctl.on_snapshot(&[task.clone()]);
        assert!(ctl.preview_for(task.id).is_some());
        ctl.finish(c.ticket, Ok(())).unwrap();
        assert!(ctl.preview_for(task.id).is_none());
    }

    #[test]
    fn new_drag_may_start_while_commit_in_flight() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 0.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(20.0, &grid());
        let first = commit(ctl.pointer_up(&grid()));

        ctl.pointer_down(&task, DragKind::ResizeEnd, 0.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(40.0, &grid());
        let second = commit(ctl.pointer_up(&grid()));
        assert_ne!(first.ticket, second.ticket);

        // The stale first result must not disturb the newer preview.
        ctl.finish(first.ticket, Err(MutationError::Backend("slow".into())))
            .unwrap_err();
        assert_eq!(
            ctl.preview_for(task.id),
            Some(&TaskPatch::end(d(2025, 1, 14)))
        );
    }

    #[test]
    fn cancel_discards_live_preview() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 0.0, 180.0, 60.0).unwrap();
        ctl.pointer_move(60.0, &grid());
        ctl.cancel();
        assert!(ctl.preview_for(task.id).is_none());
        assert!(ctl.pointer_up(&grid()).is_none());
    }

    #[test]
    fn vanished_task_cancels_gesture() {
        let task = Task::new("a", d(2025, 1, 10), d(2025, 1, 12));
        let mut ctl = editable();
        ctl.pointer_down(&task, DragKind::Move, 0.0, 180.0, 60.0).unwrap();
        ctl.on_snapshot(&[]);
        assert_eq!(ctl.phase(), DragPhase::Idle);
    }

    #[test]
    fn milestone_snaps_to_nearest_day() {
        let id = MilestoneId::new_v4();
        let mut ctl = editable();
        ctl.milestone_down(id, 300.0, 100.0).unwrap();
        ctl.pointer_move(351.0, &grid());
        assert_eq!(ctl.milestone_offset(), Some((id, 51.0)));
        assert_eq!(
            ctl.pointer_up(&grid()),
            Some(DragRelease::Milestone {
                milestone_id: id,
                date: d(2025, 1, 9)
            })
        );
    }
}
