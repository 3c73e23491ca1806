use planner_timeline::interaction::DependencyEdge;
use planner_timeline::model::{Task, TaskId};
use crate::ui::theme;
use egui::{RichText, Ui};

/// Actions the editor can request.
pub enum EditorAction {
    None,
    Rename(TaskId, String),
    AddDependency(DependencyEdge),
    RemoveDependency(DependencyEdge),
}

/// Inline editor for the selected task: name and prerequisites.
///
/// `name_buffer` holds the pending name; it is committed on Enter or when the
/// field loses focus.
pub fn show_task_editor(
    task: &Task,
    all_tasks: &[Task],
    name_buffer: &mut String,
    read_only: bool,
    ui: &mut Ui,
) -> EditorAction {
    let mut action = EditorAction::None;

    ui.add_space(6.0);
    ui.label(
        RichText::new("Edit Task")
            .strong()
            .size(13.0)
            .color(theme::TEXT_PRIMARY),
    );
    ui.add_space(4.0);

    let frame = egui::Frame {
        fill: theme::BG_DARK,
        rounding: egui::Rounding::same(4.0),
        inner_margin: egui::Margin::same(8.0),
        outer_margin: egui::Margin::ZERO,
        stroke: egui::Stroke::new(1.0, theme::BORDER_SUBTLE),
        shadow: egui::epaint::Shadow::NONE,
    };

    frame.show(ui, |ui| {
        ui.spacing_mut().item_spacing.y = 6.0;
        ui.add_enabled_ui(!read_only, |ui| {
            // ── Name ────────────────────────────────────────────
            ui.label(section("Name"));
            let name_edit = ui.add_sized(
                [ui.available_width(), 24.0],
                egui::TextEdit::singleline(name_buffer)
                    .font(egui::FontId::proportional(12.0))
                    .text_color(theme::TEXT_PRIMARY),
            );
            let submitted = name_edit.lost_focus();
            let trimmed = name_buffer.trim();
            if submitted && !trimmed.is_empty() && trimmed != task.title {
                action = EditorAction::Rename(task.id, trimmed.to_string());
            }

            ui.label(
                RichText::new(format!(
                    "{}  {}  ·  {}%",
                    egui_phosphor::regular::CALENDAR_BLANK,
                    task.week_label(),
                    task.progress
                ))
                .size(10.5)
                .color(theme::TEXT_SECONDARY),
            );

            // ── Prerequisites ───────────────────────────────────
            ui.add_space(2.0);
            ui.label(section("Depends on"));
            if task.dependencies.is_empty() {
                ui.label(RichText::new("No prerequisites").size(10.5).color(theme::TEXT_DIM));
            }
            for prereq_id in &task.dependencies {
                let name = all_tasks
                    .iter()
                    .find(|t| t.id == *prereq_id)
                    .map(|t| t.title.as_str())
                    .unwrap_or("(missing task)");
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(format!("{} {}", egui_phosphor::regular::ARROW_LEFT, name))
                            .size(11.0),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let remove = ui.add(
                            egui::Button::new(
                                RichText::new(egui_phosphor::regular::X)
                                    .size(10.0)
                                    .color(theme::TEXT_DIM),
                            )
                            .frame(false),
                        );
                        if remove.on_hover_text("Remove dependency").clicked() {
                            action = EditorAction::RemoveDependency(DependencyEdge {
                                prerequisite: *prereq_id,
                                dependent: task.id,
                            });
                        }
                    });
                });
            }

            let candidates: Vec<&Task> = all_tasks
                .iter()
                .filter(|t| t.id != task.id && !task.depends_on(t.id))
                .collect();
            if !candidates.is_empty() {
                egui::ComboBox::from_id_salt(("add_dependency", task.id))
                    .selected_text(
                        RichText::new(format!("{} Add prerequisite…", egui_phosphor::regular::PLUS))
                            .size(11.0),
                    )
                    .width(ui.available_width())
                    .show_ui(ui, |ui| {
                        for candidate in candidates {
                            if ui.selectable_label(false, &candidate.title).clicked() {
                                action = EditorAction::AddDependency(DependencyEdge {
                                    prerequisite: candidate.id,
                                    dependent: task.id,
                                });
                            }
                        }
                    });
            }
        });
    });

    action
}

fn section(text: &str) -> RichText {
    RichText::new(text)
        .size(10.0)
        .color(theme::TEXT_DIM)
        .strong()
}
