use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Datelike, NaiveDate};
use tracing::{error, info, warn};

use planner_timeline::dispatch::Dispatcher;
use planner_timeline::io::milestones::MilestoneStore;
use planner_timeline::model::{MilestoneId, NewTask, Task, TaskId, ViewMode};
use planner_timeline::planner::READ_ONLY_MESSAGE;
use planner_timeline::store::{MemoryTaskStore, Subscription, TaskChangeFeed};
use planner_timeline::PlannerState;

use crate::ui;
use crate::ui::gantt_chart::ChartAction;

/// State of the add/rename milestone dialog.
pub struct MilestoneDialog {
    /// `Some` when renaming an existing milestone.
    pub editing: Option<MilestoneId>,
    pub name: String,
    pub date: NaiveDate,
}

/// Main application state.
pub struct PlannerApp {
    pub planner: PlannerState,
    dispatcher: Dispatcher,
    /// Latest snapshot pushed by the change feed, not yet applied.
    inbox: Rc<RefCell<Option<Vec<Task>>>>,
    _subscription: Subscription,
    milestone_store: MilestoneStore,

    pub selected_task: Option<TaskId>,
    /// Pending name in the editor, keyed by the task it belongs to.
    name_buffer: (Option<TaskId>, String),

    // Dialog state
    pub show_add_task: bool,
    pub show_about: bool,
    pub new_task: NewTask,
    pub milestone_dialog: Option<MilestoneDialog>,

    pub status_message: String,
    scroll_to: Option<f32>,
    chart_width: f32,
}

impl PlannerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        planner: PlannerState,
        store: MemoryTaskStore,
        milestone_store: MilestoneStore,
    ) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        let inbox: Rc<RefCell<Option<Vec<Task>>>> = Rc::new(RefCell::new(None));
        let subscription = {
            let inbox = Rc::clone(&inbox);
            let ctx = cc.egui_ctx.clone();
            store.subscribe(Box::new(move |tasks: &[Task]| {
                *inbox.borrow_mut() = Some(tasks.to_vec());
                ctx.request_repaint();
            }))
        };

        let today = chrono::Local::now().date_naive();
        let status_message = if planner.read_only() {
            READ_ONLY_MESSAGE.to_string()
        } else {
            "Ready".to_string()
        };

        Self {
            planner,
            dispatcher: Dispatcher::new(Rc::new(store)),
            inbox,
            _subscription: subscription,
            milestone_store,
            selected_task: None,
            name_buffer: (None, String::new()),
            show_add_task: false,
            show_about: false,
            new_task: Self::blank_task(today),
            milestone_dialog: None,
            status_message,
            scroll_to: None,
            chart_width: 0.0,
        }
    }

    fn blank_task(today: NaiveDate) -> NewTask {
        NewTask {
            title: String::new(),
            start: today,
            end: today + chrono::Duration::days(7),
        }
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    // ── Commands used by the toolbar and dialogs ────────────────

    pub fn open_add_task(&mut self) {
        if self.planner.read_only() {
            self.status_message = READ_ONLY_MESSAGE.to_string();
            return;
        }
        self.new_task = Self::blank_task(Self::today());
        self.show_add_task = true;
    }

    pub fn create_task_from_dialog(&mut self) {
        let task = std::mem::replace(&mut self.new_task, Self::blank_task(Self::today()));
        if let Err(e) = task.validate() {
            self.status_message = format!("Cannot add task: {e}");
            return;
        }
        self.status_message = format!("Adding '{}'…", task.title.trim());
        self.dispatcher.create(task);
    }

    pub fn open_milestone_dialog(&mut self, editing: Option<MilestoneId>) {
        let existing = editing.and_then(|id| self.planner.milestones().get(id));
        self.milestone_dialog = Some(match existing {
            Some(m) => MilestoneDialog {
                editing,
                name: m.name.clone(),
                date: m.parsed_date().unwrap_or_else(Self::today),
            },
            None => MilestoneDialog {
                editing: None,
                name: String::new(),
                date: Self::today(),
            },
        });
    }

    pub fn submit_milestone_dialog(&mut self) {
        let Some(dialog) = self.milestone_dialog.take() else {
            return;
        };
        match dialog.editing {
            Some(id) => {
                if self.planner.rename_milestone(id, &dialog.name) {
                    self.status_message = format!("Renamed milestone to '{}'", dialog.name.trim());
                }
            }
            None => match self.planner.add_milestone(&dialog.name, dialog.date) {
                Ok(_) => self.status_message = format!("Added milestone '{}'", dialog.name.trim()),
                Err(e) => self.status_message = format!("Cannot add milestone: {e}"),
            },
        }
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        if let Err(e) = self.planner.set_mode(mode, Self::today()) {
            warn!(%e, "could not switch view mode");
            self.status_message = format!("Cannot switch view: {e}");
        }
    }

    pub fn show_month(&mut self, year: i32, month: u32) {
        if let Err(e) = self.planner.show_month(year, month) {
            self.status_message = format!("Cannot show month: {e}");
        }
    }

    pub fn go_to_today(&mut self) {
        let today = Self::today();
        if self.planner.viewport().mode() == ViewMode::Monthly {
            match self.planner.show_month(today.year(), today.month()) {
                Ok(true) => {}
                _ => {
                    self.status_message = "Today is outside the configured years".into();
                    return;
                }
            }
        }
        if !self.planner.viewport().range().contains(today) {
            self.status_message = "Today is outside the configured years".into();
            return;
        }
        self.scroll_to = Some(self.planner.viewport().scroll_offset_for(today, self.chart_width));
    }

    fn delete_task(&mut self, task_id: TaskId) {
        if self.planner.read_only() {
            self.status_message = READ_ONLY_MESSAGE.to_string();
            return;
        }
        self.dispatcher.delete(task_id, self.planner.tasks().to_vec());
        if self.selected_task == Some(task_id) {
            self.selected_task = None;
        }
    }

    // ── Store sync ──────────────────────────────────────────────

    /// Poll in-flight writes, apply the newest snapshot, then fold the
    /// finished writes in. Snapshot first, so a successful drag sees the
    /// data it produced and drops its preview in the same frame.
    fn sync_with_store(&mut self) {
        self.dispatcher.run_until_stalled();
        if let Some(tasks) = self.inbox.borrow_mut().take() {
            self.planner.on_snapshot(&tasks);
        }
        for outcome in self.dispatcher.drain() {
            if let Some(message) = self.planner.absorb(outcome) {
                self.status_message = message;
            }
        }
        if let Some(id) = self.selected_task {
            if self.planner.task(id).is_none() {
                self.selected_task = None;
            }
        }
    }

    fn save_milestones_if_dirty(&mut self) {
        if !self.planner.take_milestones_dirty() {
            return;
        }
        match self.milestone_store.save(self.planner.milestones()) {
            Ok(()) => info!(path = %self.milestone_store.path().display(), "saved milestones"),
            Err(e) => {
                error!(%e, "could not save milestones");
                self.status_message = format!("Could not save milestones: {e}");
            }
        }
    }

    fn handle_chart_action(&mut self, action: ChartAction) {
        match action {
            ChartAction::Commit(commit) => {
                self.status_message = "Saving…".into();
                self.dispatcher.commit_drag(commit);
            }
            ChartAction::Link(edge) => {
                let name = |id| {
                    self.planner
                        .task(id)
                        .map(|t| t.title.clone())
                        .unwrap_or_default()
                };
                self.status_message = format!(
                    "Linked '{}' → '{}'",
                    name(edge.prerequisite),
                    name(edge.dependent)
                );
                self.dispatcher.link(edge);
            }
            ChartAction::Unlink(edge) => {
                self.status_message = "Dependency removed".into();
                self.dispatcher.unlink(edge);
            }
            ChartAction::Select(task_id) => self.selected_task = task_id,
            ChartAction::Notice(message) => self.status_message = message,
        }
    }
}

impl eframe::App for PlannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::theme::apply_theme(ctx);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) && self.planner.cancel_linking() {
            self.status_message = "Linking cancelled".into();
        }

        self.sync_with_store();
        let today = Self::today();

        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_STATUS)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_status())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!("Tasks: {}", self.planner.tasks().len()))
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM),
                        );
                        ui.label(egui::RichText::new(" · ").size(10.5).color(ui::theme::TEXT_DIM));
                        ui.label(
                            egui::RichText::new(format!(
                                "{:.0} px/day",
                                self.planner.viewport().grid().day_width()
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        // Left panel: editor, task list, milestones
        let mut task_action = ui::task_table::TaskTableAction::None;
        let mut milestone_action = ui::task_table::TaskTableAction::None;
        let mut editor_action = ui::task_editor::EditorAction::None;
        egui::SidePanel::left("task_panel")
            .default_width(ui::theme::SIDE_PANEL_WIDTH)
            .min_width(200.0)
            .max_width(ui::theme::SIDE_PANEL_WIDTH * 2.0)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .inner_margin(egui::Margin::same(8.0))
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                if let Some(task) = self.selected_task.and_then(|id| self.planner.task(id)) {
                    if self.name_buffer.0 != Some(task.id) {
                        self.name_buffer = (Some(task.id), task.title.clone());
                    }
                    editor_action = ui::task_editor::show_task_editor(
                        task,
                        self.planner.tasks(),
                        &mut self.name_buffer.1,
                        self.planner.read_only(),
                        ui,
                    );
                    ui.add_space(4.0);
                    ui.separator();
                    ui.add_space(2.0);
                }

                task_action = ui::task_table::show_task_table(
                    self.planner.tasks(),
                    self.selected_task,
                    self.planner.read_only(),
                    ui,
                );
                milestone_action = ui::task_table::show_milestone_list(self.planner.milestones(), ui);
            });

        match editor_action {
            ui::task_editor::EditorAction::Rename(task_id, title) => {
                self.dispatcher.rename(task_id, title);
            }
            ui::task_editor::EditorAction::AddDependency(edge) => {
                self.handle_chart_action(ChartAction::Link(edge));
            }
            ui::task_editor::EditorAction::RemoveDependency(edge) => {
                self.handle_chart_action(ChartAction::Unlink(edge));
            }
            ui::task_editor::EditorAction::None => {}
        }

        for action in [task_action, milestone_action] {
            match action {
                ui::task_table::TaskTableAction::Select(id) => self.selected_task = Some(id),
                ui::task_table::TaskTableAction::Delete(id) => self.delete_task(id),
                ui::task_table::TaskTableAction::Add => self.open_add_task(),
                ui::task_table::TaskTableAction::AddMilestone => self.open_milestone_dialog(None),
                ui::task_table::TaskTableAction::RenameMilestone(id) => {
                    self.open_milestone_dialog(Some(id));
                }
                ui::task_table::TaskTableAction::DeleteMilestone(id) => {
                    if self.planner.remove_milestone(id) {
                        self.status_message = "Milestone removed".into();
                    }
                }
                ui::task_table::TaskTableAction::None => {}
            }
        }

        // Central panel: Gantt chart
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        let scroll_to = self.scroll_to.take();
        let actions = egui::CentralPanel::default()
            .frame(chart_frame)
            .show(ctx, |ui| {
                self.chart_width = ui.available_width();
                ui::gantt_chart::show_gantt_chart(
                    &mut self.planner,
                    self.selected_task,
                    today,
                    scroll_to,
                    ui,
                )
            })
            .inner;
        let dispatched = !actions.is_empty();
        for action in actions {
            self.handle_chart_action(action);
        }
        if dispatched {
            // Poll the new writes next frame even if nothing else moves.
            ctx.request_repaint();
        }

        // Dialogs
        if self.show_add_task {
            ui::dialogs::show_add_task_dialog(self, ctx);
        }
        if self.milestone_dialog.is_some() {
            ui::dialogs::show_milestone_dialog(self, ctx);
        }
        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }
        self.save_milestones_if_dirty();
    }
}
