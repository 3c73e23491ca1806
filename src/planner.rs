//! The planner's state: cached tasks, milestones, the viewport and both
//! interaction controllers. The UI reads layouts from here and feeds pointer
//! events and store outcomes back in.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::PlannerSettings;
use crate::dispatch::Outcome;
use crate::error::{RangeError, ValidationError};
use crate::interaction::{
    DependencyLinkController, DragError, DragInteractionController, DragKind, DragPhase,
    DragRelease, HandleHit, LinkEffect, LinkingState, PendingCommit,
};
use crate::model::{
    today_index, DateGrid, HeaderTracks, MilestoneBook, MilestoneId, Point, Task, TaskId,
    TimelineLayout, TimelineLayoutEngine, ViewMode, Viewport,
};

pub const READ_ONLY_MESSAGE: &str = "Read-only mode: tasks cannot be modified";

pub struct PlannerState {
    tasks: Vec<Task>,
    milestones: MilestoneBook,
    milestones_dirty: bool,
    viewport: Viewport,
    engine: TimelineLayoutEngine,
    /// Layout of the stored tasks, without any drag preview.
    layout: TimelineLayout,
    drag: DragInteractionController,
    link: DependencyLinkController,
    show_today_line: bool,
    monthly_day_width: f32,
    read_only: bool,
}

impl PlannerState {
    pub fn new(
        settings: &PlannerSettings,
        milestones: MilestoneBook,
        today: NaiveDate,
    ) -> Result<Self, RangeError> {
        let mut viewport = Viewport::new(settings.start_year, settings.end_year, settings.day_width)?;
        if settings.mode == ViewMode::Monthly {
            viewport.set_mode(ViewMode::Monthly, today, settings.monthly_day_width)?;
        }
        let read_only = settings.read_only;
        let mut state = Self {
            tasks: Vec::new(),
            milestones,
            milestones_dirty: false,
            viewport,
            engine: TimelineLayoutEngine::new(settings.row_height),
            layout: TimelineLayout::default(),
            drag: DragInteractionController::new(move |_: &Task| !read_only),
            link: DependencyLinkController::new(),
            show_today_line: settings.show_today_line,
            monthly_day_width: settings.monthly_day_width,
            read_only,
        };
        state.relayout();
        Ok(state)
    }

    // ── Getters ─────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn milestones(&self) -> &MilestoneBook {
        &self.milestones
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn grid(&self) -> DateGrid {
        self.viewport.grid()
    }

    pub fn engine(&self) -> TimelineLayoutEngine {
        self.engine
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn committed_layout(&self) -> &TimelineLayout {
        &self.layout
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.drag.phase()
    }

    pub fn dragged_task(&self) -> Option<(TaskId, DragKind)> {
        self.drag.dragged_task()
    }

    pub fn is_linking(&self) -> bool {
        self.link.is_linking()
    }

    pub fn rubber_band(&self) -> Option<(Point, Point)> {
        self.link.rubber_band()
    }

    pub fn header(&self) -> HeaderTracks {
        HeaderTracks::build(&self.grid())
    }

    /// Column for the today line, when enabled and visible.
    pub fn today_index(&self, today: NaiveDate) -> Option<i64> {
        if !self.show_today_line {
            return None;
        }
        today_index(&self.grid(), today)
    }

    pub fn show_today_line(&self) -> bool {
        self.show_today_line
    }

    pub fn set_show_today_line(&mut self, show: bool) {
        self.show_today_line = show;
    }

    // ── Store sync ──────────────────────────────────────────────

    /// A new task list arrived from the change feed.
    pub fn on_snapshot(&mut self, tasks: &[Task]) {
        debug!(count = tasks.len(), "task snapshot");
        self.tasks = tasks.to_vec();
        self.drag.on_snapshot(tasks);
        if let LinkingState::Linking { from_task_id, .. } = self.link.state() {
            if self.task(from_task_id).is_none() {
                self.link.escape();
            }
        }
        self.relayout();
    }

    fn relayout(&mut self) {
        self.layout = self
            .engine
            .layout(&self.tasks, &self.milestones.milestones, &self.grid());
    }

    /// Stored tasks with any drag previews laid over them.
    pub fn visible_tasks(&self) -> Vec<Task> {
        let mut tasks = self.tasks.clone();
        for (task_id, patch) in self.drag.previews() {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) {
                task.apply(patch);
            }
        }
        tasks
    }

    /// What to draw this frame: the committed layout, or a fresh one over the
    /// previews when anything is being dragged or written.
    pub fn visible_layout(&self) -> TimelineLayout {
        let mut layout = if self.drag.previews().next().is_none() {
            self.layout.clone()
        } else {
            self.engine
                .layout(&self.visible_tasks(), &self.milestones.milestones, &self.grid())
        };
        if let Some((milestone_id, offset)) = self.drag.milestone_offset() {
            if let Some(marker) = layout
                .milestones
                .iter_mut()
                .find(|m| m.milestone_id == milestone_id)
            {
                marker.x += offset;
            }
        }
        layout
    }

    /// Fold a finished store write back in. Returns a message for the user
    /// when something went wrong.
    pub fn absorb(&mut self, outcome: Outcome) -> Option<String> {
        match outcome {
            Outcome::DragCommitted { ticket, result, .. } => self
                .drag
                .finish(ticket, result)
                .err()
                .map(|e| format!("Could not save task: {e}")),
            Outcome::Linked { result, .. } => {
                result.err().map(|e| format!("Could not add dependency: {e}"))
            }
            Outcome::Unlinked { result, .. } => result
                .err()
                .map(|e| format!("Could not remove dependency: {e}")),
            Outcome::Created { title, result } => match result {
                Ok(id) => {
                    info!(task = %id, "created task");
                    None
                }
                Err(e) => Some(format!("Could not create '{title}': {e}")),
            },
            Outcome::Renamed { result, .. } => {
                result.err().map(|e| format!("Could not rename task: {e}"))
            }
            Outcome::Deleted { result, .. } => {
                result.err().map(|e| format!("Could not delete task: {e}"))
            }
        }
    }

    // ── Dragging ────────────────────────────────────────────────

    /// Pointer went down on part of a task bar.
    pub fn begin_task_drag(
        &mut self,
        task_id: TaskId,
        kind: DragKind,
        pointer_x: f32,
    ) -> Result<(), DragError> {
        // Start from what is on screen, which may be an in-flight preview.
        let task = self
            .visible_tasks()
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or(DragError::NotOnTimeline)?;
        let grid = self.grid();
        let (bar_left, bar_width) = self
            .visible_layout()
            .bar(task_id)
            .map(|bar| bar.x_extent(&grid))
            .ok_or(DragError::NotOnTimeline)?;
        self.drag
            .pointer_down(&task, kind, pointer_x, bar_left, bar_width)
    }

    pub fn begin_milestone_drag(
        &mut self,
        milestone_id: MilestoneId,
        pointer_x: f32,
    ) -> Result<(), DragError> {
        let marker_x = self
            .layout
            .marker(milestone_id)
            .map(|m| m.x)
            .ok_or(DragError::NotOnTimeline)?;
        self.drag.milestone_down(milestone_id, pointer_x, marker_x)
    }

    pub fn drag_to(&mut self, pointer_x: f32) {
        let grid = self.grid();
        self.drag.pointer_move(pointer_x, &grid);
    }

    /// Pointer released. A task gesture yields the write to dispatch;
    /// milestone gestures are applied here.
    pub fn end_drag(&mut self) -> Option<PendingCommit> {
        let grid = self.grid();
        match self.drag.pointer_up(&grid)? {
            DragRelease::Task(commit) => Some(commit),
            DragRelease::Milestone { milestone_id, date } => {
                if self.milestones.move_to(milestone_id, date) {
                    self.milestones_dirty = true;
                    self.relayout();
                }
                None
            }
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    // ── Linking ─────────────────────────────────────────────────

    pub fn click_link_handle(&mut self, hit: HandleHit) -> LinkEffect {
        if self.read_only {
            return LinkEffect::Ignored;
        }
        self.link.click(hit, &self.tasks)
    }

    pub fn link_pointer_moved(&mut self, pointer: Point) {
        self.link.pointer_moved(pointer);
    }

    /// Escape. Returns whether a link was being drawn.
    pub fn cancel_linking(&mut self) -> bool {
        self.link.escape()
    }

    // ── Viewport ────────────────────────────────────────────────

    fn viewport_changed(&mut self) {
        // The grid moved under any active gesture.
        self.drag.cancel();
        self.relayout();
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.viewport_changed();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.viewport_changed();
    }

    pub fn set_mode(&mut self, mode: ViewMode, today: NaiveDate) -> Result<(), RangeError> {
        self.viewport.set_mode(mode, today, self.monthly_day_width)?;
        self.viewport_changed();
        Ok(())
    }

    pub fn navigate_month(&mut self, direction: i32) -> bool {
        let moved = self.viewport.navigate_month(direction);
        if moved {
            self.viewport_changed();
        }
        moved
    }

    pub fn show_month(&mut self, year: i32, month: u32) -> Result<bool, RangeError> {
        let moved = self.viewport.show_month(year, month)?;
        if moved {
            self.viewport_changed();
        }
        Ok(moved)
    }

    // ── Milestones ──────────────────────────────────────────────

    pub fn add_milestone(
        &mut self,
        name: &str,
        date: NaiveDate,
    ) -> Result<MilestoneId, ValidationError> {
        let id = self.milestones.add(name, date)?;
        self.milestones_dirty = true;
        self.relayout();
        Ok(id)
    }

    pub fn rename_milestone(&mut self, milestone_id: MilestoneId, name: &str) -> bool {
        let changed = self.milestones.rename(milestone_id, name);
        self.milestones_dirty |= changed;
        changed
    }

    pub fn remove_milestone(&mut self, milestone_id: MilestoneId) -> bool {
        let removed = self.milestones.remove(milestone_id);
        if removed {
            self.milestones_dirty = true;
            self.relayout();
        } else {
            warn!(milestone = %milestone_id, "no such milestone");
        }
        removed
    }

    /// Whether milestones changed since the last call.
    pub fn take_milestones_dirty(&mut self) -> bool {
        std::mem::take(&mut self.milestones_dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MutationError;
    use crate::interaction::HandleSide;
    use crate::model::TaskPatch;
    use pretty_assertions::assert_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn january(read_only: bool) -> PlannerState {
        let settings = PlannerSettings {
            mode: ViewMode::Monthly,
            monthly_day_width: 20.0,
            read_only,
            ..Default::default()
        };
        PlannerState::new(&settings, MilestoneBook::default(), d(1, 20)).unwrap()
    }

    #[test]
    fn preview_is_drawn_over_committed_layout() {
        let task = Task::new("a", d(1, 10), d(1, 12));
        let mut planner = january(false);
        planner.on_snapshot(&[task.clone()]);
        assert_eq!(planner.committed_layout().bar(task.id).unwrap().start_index, 9);

        planner.begin_task_drag(task.id, DragKind::Move, 190.0).unwrap();
        planner.drag_to(230.0);
        assert_eq!(planner.visible_layout().bar(task.id).unwrap().start_index, 11);
        assert_eq!(planner.committed_layout().bar(task.id).unwrap().start_index, 9);

        // A snapshot mid-drag keeps the preview on top.
        planner.on_snapshot(&[task.clone()]);
        assert_eq!(planner.visible_layout().bar(task.id).unwrap().start_index, 11);
    }

    #[test]
    fn rejected_commit_reverts_bar_and_reports() {
        let task = Task::new("a", d(1, 10), d(1, 12));
        let mut planner = january(false);
        planner.on_snapshot(&[task.clone()]);
        let before = planner.visible_layout();

        planner.begin_task_drag(task.id, DragKind::Move, 190.0).unwrap();
        planner.drag_to(290.0);
        let commit = planner.end_drag().unwrap();
        assert_eq!(commit.patch, TaskPatch::dates(d(1, 15), d(1, 17)));
        assert_eq!(planner.drag_phase(), DragPhase::Committing);

        let message = planner.absorb(Outcome::DragCommitted {
            ticket: commit.ticket,
            task_id: task.id,
            result: Err(MutationError::Backend("network down".into())),
        });
        assert!(message.unwrap().contains("network down"));
        assert_eq!(planner.visible_layout(), before);
        assert_eq!(planner.drag_phase(), DragPhase::Idle);
    }

    #[test]
    fn read_only_blocks_drags_and_links() {
        let a = Task::new("a", d(1, 10), d(1, 12));
        let mut planner = january(true);
        planner.on_snapshot(&[a.clone()]);
        assert_eq!(
            planner.begin_task_drag(a.id, DragKind::Move, 190.0),
            Err(DragError::NotEditable)
        );
        let hit = HandleHit {
            task_id: a.id,
            side: HandleSide::End,
            anchor: Point::new(0.0, 0.0),
        };
        assert_eq!(planner.click_link_handle(hit), LinkEffect::Ignored);
        assert!(!planner.is_linking());
    }

    #[test]
    fn milestone_drag_moves_and_marks_dirty() {
        let mut planner = january(false);
        let id = planner.add_milestone("Review", d(1, 5)).unwrap();
        assert!(planner.take_milestones_dirty());
        assert!(!planner.take_milestones_dirty());

        planner.begin_milestone_drag(id, 85.0).unwrap();
        planner.drag_to(145.0);
        assert_eq!(planner.visible_layout().marker(id).unwrap().x, 140.0);
        assert!(planner.end_drag().is_none());

        assert_eq!(planner.milestones().get(id).unwrap().date, "2025-01-08");
        assert_eq!(planner.committed_layout().marker(id).unwrap().index, 7);
        assert!(planner.take_milestones_dirty());
    }

    #[test]
    fn zoom_cancels_active_drag() {
        let task = Task::new("a", d(1, 10), d(1, 12));
        let mut planner = january(false);
        planner.on_snapshot(&[task.clone()]);
        planner.begin_task_drag(task.id, DragKind::Move, 190.0).unwrap();
        planner.zoom_in();
        assert_eq!(planner.drag_phase(), DragPhase::Idle);
        assert!(planner.end_drag().is_none());
    }

    #[test]
    fn dragging_past_the_month_still_releases() {
        let a = Task::new("a", d(1, 10), d(1, 12));
        let b = Task::new("b", d(1, 3), d(1, 4));
        let mut planner = january(false);
        planner.on_snapshot(&[a.clone(), b.clone()]);

        planner.begin_task_drag(a.id, DragKind::Move, 190.0).unwrap();
        planner.drag_to(990.0);
        let bar = planner.visible_layout().bar(a.id).cloned().unwrap();
        assert_eq!((bar.start_index, bar.end_index), (30, 30));

        let commit = planner.end_drag().unwrap();
        assert_eq!(commit.patch, TaskPatch::dates(d(1, 31), d(2, 2)));
        assert_eq!(planner.drag_phase(), DragPhase::Committing);
        assert_eq!(planner.begin_task_drag(b.id, DragKind::Move, 50.0), Ok(()));
        assert_eq!(planner.dragged_task(), Some((b.id, DragKind::Move)));
    }

    #[test]
    fn today_line_respects_setting() {
        let mut planner = january(false);
        assert!(planner.show_today_line());
        assert_eq!(planner.today_index(d(1, 20)), Some(19));
        assert_eq!(planner.today_index(d(2, 1)), None);
        planner.set_show_today_line(false);
        assert!(!planner.show_today_line());
        assert_eq!(planner.today_index(d(1, 20)), None);
    }

    #[test]
    fn linking_from_a_deleted_task_is_dropped() {
        let a = Task::new("a", d(1, 10), d(1, 12));
        let mut planner = january(false);
        planner.on_snapshot(&[a.clone()]);
        let hit = HandleHit {
            task_id: a.id,
            side: HandleSide::End,
            anchor: Point::new(0.0, 0.0),
        };
        assert_eq!(planner.click_link_handle(hit), LinkEffect::Started);
        planner.on_snapshot(&[]);
        assert!(!planner.is_linking());
    }
}
