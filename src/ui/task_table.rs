use planner_timeline::model::{MilestoneBook, MilestoneId, Task, TaskId};
use crate::ui::theme;
use egui::{Color32, RichText, Ui};

/// Actions that the side lists can request.
pub enum TaskTableAction {
    None,
    Select(TaskId),
    Delete(TaskId),
    Add,
    AddMilestone,
    RenameMilestone(MilestoneId),
    DeleteMilestone(MilestoneId),
}

/// Render the left-side task list, one row per timeline row.
pub fn show_task_table(
    tasks: &[Task],
    selected_task: Option<TaskId>,
    read_only: bool,
    ui: &mut Ui,
) -> TaskTableAction {
    let mut action = TaskTableAction::None;

    ui.add_space(2.0);
    ui.horizontal(|ui| {
        ui.label(
            RichText::new("Tasks")
                .strong()
                .size(15.0)
                .color(theme::TEXT_PRIMARY),
        );
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!("({})", tasks.len()))
                .size(11.0)
                .color(theme::TEXT_DIM),
        );
    });
    ui.add_space(4.0);

    let btn = egui::Button::new(RichText::new("＋  Add Task").color(Color32::WHITE).size(12.0))
        .fill(theme::ACCENT)
        .rounding(egui::Rounding::same(5.0));
    if ui
        .add_enabled_ui(!read_only, |ui| ui.add_sized([ui.available_width(), 30.0], btn))
        .inner
        .clicked()
    {
        action = TaskTableAction::Add;
    }

    ui.add_space(6.0);
    ui.separator();

    egui::ScrollArea::vertical()
        .id_salt("task_rows")
        .auto_shrink([false, false])
        .max_height(ui.available_height() * 0.65)
        .show(ui, |ui| {
            for (i, task) in tasks.iter().enumerate() {
                let is_selected = selected_task == Some(task.id);
                let row_bg = if is_selected {
                    theme::BG_SELECTED
                } else if i % 2 == 0 {
                    theme::BG_PANEL
                } else {
                    theme::BG_DARK
                };

                let frame = egui::Frame {
                    fill: row_bg,
                    rounding: egui::Rounding::same(4.0),
                    inner_margin: egui::Margin::symmetric(6.0, 4.0),
                    outer_margin: egui::Margin::ZERO,
                    stroke: egui::Stroke::NONE,
                    shadow: egui::epaint::Shadow::NONE,
                };

                let frame_resp = frame.show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.spacing_mut().item_spacing.x = 6.0;

                        let (dot_rect, _) =
                            ui.allocate_exact_size(egui::vec2(6.0, 6.0), egui::Sense::hover());
                        let dot = if task.date_span().is_some() {
                            theme::task_color(i)
                        } else {
                            theme::TEXT_DIM
                        };
                        ui.painter().circle_filled(dot_rect.center(), 3.0, dot);

                        let name_text = RichText::new(&task.title).size(12.0).color(
                            if is_selected {
                                Color32::WHITE
                            } else {
                                theme::TEXT_PRIMARY
                            },
                        );
                        ui.add(egui::Label::new(name_text).truncate());

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.spacing_mut().item_spacing.x = 4.0;

                            if !read_only {
                                let del_btn = ui.add(
                                    egui::Button::new(
                                        RichText::new("✕").size(10.0).color(theme::TEXT_DIM),
                                    )
                                    .frame(false),
                                );
                                if del_btn.on_hover_text("Delete task").clicked() {
                                    action = TaskTableAction::Delete(task.id);
                                }
                            }

                            let pbar = egui::ProgressBar::new(f32::from(task.progress) / 100.0)
                                .desired_width(40.0)
                                .fill(theme::task_color(i))
                                .rounding(egui::Rounding::same(3.0));
                            ui.add(pbar);

                            ui.label(
                                RichText::new(task.week_label())
                                    .size(10.0)
                                    .color(theme::TEXT_SECONDARY),
                            );
                        });
                    });
                });

                let row_click = ui.interact(
                    frame_resp.response.rect,
                    egui::Id::new(("task-row", task.id)),
                    egui::Sense::click(),
                );
                if row_click.clicked() {
                    action = TaskTableAction::Select(task.id);
                }
                ui.add_space(1.0);
            }
        });

    ui.add_space(6.0);
    ui.separator();
    action
}

/// Render the local milestone list below the tasks.
pub fn show_milestone_list(milestones: &MilestoneBook, ui: &mut Ui) -> TaskTableAction {
    let mut action = TaskTableAction::None;

    ui.horizontal(|ui| {
        ui.label(
            RichText::new("Milestones")
                .strong()
                .size(13.0)
                .color(theme::TEXT_PRIMARY),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .small_button(egui_phosphor::regular::PLUS)
                .on_hover_text("Add milestone")
                .clicked()
            {
                action = TaskTableAction::AddMilestone;
            }
        });
    });

    egui::ScrollArea::vertical()
        .id_salt("milestone_rows")
        .auto_shrink([false, true])
        .show(ui, |ui| {
            for milestone in milestones.iter() {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("◆").color(theme::MILESTONE).size(10.0));
                    ui.add(egui::Label::new(RichText::new(&milestone.name).size(11.5)).truncate());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add(egui::Button::new(RichText::new("✕").size(10.0)).frame(false))
                            .on_hover_text("Delete milestone")
                            .clicked()
                        {
                            action = TaskTableAction::DeleteMilestone(milestone.id);
                        }
                        if ui
                            .add(
                                egui::Button::new(
                                    RichText::new(egui_phosphor::regular::PENCIL_SIMPLE).size(10.0),
                                )
                                .frame(false),
                            )
                            .on_hover_text("Rename milestone")
                            .clicked()
                        {
                            action = TaskTableAction::RenameMilestone(milestone.id);
                        }
                        ui.label(
                            RichText::new(&milestone.date)
                                .size(10.0)
                                .color(theme::TEXT_SECONDARY),
                        );
                    });
                });
            }
        });

    action
}
