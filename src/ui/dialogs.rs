use crate::app::PlannerApp;
use crate::ui::theme;
use egui::{Color32, Context, RichText, Window};

/// Render the "Add Task" dialog.
pub fn show_add_task_dialog(app: &mut PlannerApp, ctx: &Context) {
    let mut should_close = false;
    Window::new(RichText::new("Add Task").strong().size(14.0))
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([320.0, 0.0])
        .show(ctx, |ui| {
            ui.add_space(4.0);

            egui::Grid::new("add_task_grid")
                .num_columns(2)
                .striped(false)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Name").color(theme::TEXT_SECONDARY));
                    ui.add_sized(
                        [220.0, 24.0],
                        egui::TextEdit::singleline(&mut app.new_task.title)
                            .hint_text("Task name...")
                            .text_color(theme::TEXT_PRIMARY),
                    );
                    ui.end_row();

                    ui.label(RichText::new("Start").color(theme::TEXT_SECONDARY));
                    ui.add(
                        egui_extras::DatePickerButton::new(&mut app.new_task.start)
                            .id_salt("dlg_dp_start"),
                    );
                    ui.end_row();

                    ui.label(RichText::new("End").color(theme::TEXT_SECONDARY));
                    ui.add(
                        egui_extras::DatePickerButton::new(&mut app.new_task.end)
                            .id_salt("dlg_dp_end"),
                    );
                    ui.end_row();
                });

            if let Err(e) = app.new_task.validate() {
                ui.label(RichText::new(e.to_string()).size(10.5).color(theme::ARROW_WARNING));
            }

            ui.add_space(6.0);
            ui.separator();
            ui.add_space(4.0);

            ui.horizontal(|ui| {
                let create_btn = egui::Button::new(RichText::new("Create").color(Color32::WHITE))
                    .fill(theme::ACCENT)
                    .rounding(egui::Rounding::same(4.0));
                let can_create = app.new_task.validate().is_ok();
                if ui
                    .add_enabled(can_create, create_btn)
                    .clicked()
                {
                    app.create_task_from_dialog();
                    should_close = true;
                }
                if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                    should_close = true;
                }
            });
            ui.add_space(2.0);
        });

    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_add_task = false;
    }
}

/// Render the add/rename milestone dialog.
pub fn show_milestone_dialog(app: &mut PlannerApp, ctx: &Context) {
    let Some(dialog) = app.milestone_dialog.as_mut() else {
        return;
    };
    let title = if dialog.editing.is_some() {
        "Rename Milestone"
    } else {
        "New Milestone"
    };
    let mut submit = false;
    let mut should_close = false;

    Window::new(RichText::new(title).strong().size(14.0))
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([300.0, 0.0])
        .show(ctx, |ui| {
            egui::Grid::new("milestone_grid")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Name").color(theme::TEXT_SECONDARY));
                    let edit = ui.add_sized(
                        [200.0, 24.0],
                        egui::TextEdit::singleline(&mut dialog.name).hint_text("Milestone..."),
                    );
                    if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        submit = true;
                    }
                    ui.end_row();

                    // Renaming keeps the date; moving is done by dragging the marker.
                    if dialog.editing.is_none() {
                        ui.label(RichText::new("Date").color(theme::TEXT_SECONDARY));
                        ui.add(
                            egui_extras::DatePickerButton::new(&mut dialog.date)
                                .id_salt("dlg_milestone_date"),
                        );
                        ui.end_row();
                    }
                });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let ok = egui::Button::new(RichText::new("Save").color(Color32::WHITE))
                    .fill(theme::ACCENT)
                    .rounding(egui::Rounding::same(4.0));
                if ui
                    .add_enabled(!dialog.name.trim().is_empty(), ok)
                    .clicked()
                {
                    submit = true;
                }
                if ui.button("Cancel").clicked() {
                    should_close = true;
                }
            });
        });

    if submit {
        app.submit_milestone_dialog();
    } else if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.milestone_dialog = None;
    }
}

/// Render the "About" dialog.
pub fn show_about_dialog(app: &mut PlannerApp, ctx: &Context) {
    let mut should_close = false;
    Window::new("About")
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([300.0, 200.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading(RichText::new("Planner Timeline").strong());
                ui.add_space(2.0);
                ui.label(
                    RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                        .color(theme::TEXT_SECONDARY),
                );
                ui.add_space(10.0);
                ui.label("Drag bars to move, edges to resize, the knob to set progress.");
                ui.label("Click a bar's end dot, then another bar's start ring, to link.");
                ui.add_space(14.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Close")).clicked() {
                    should_close = true;
                }
            });
        });
    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_about = false;
    }
}
