use crate::app::PlannerApp;
use planner_timeline::model::timeline::MONTH_NAMES;
use planner_timeline::model::ViewMode;
use crate::ui::theme;
use chrono::Datelike;
use egui::{menu, RichText, Ui};

/// Render the top menu bar and the view controls.
pub fn show_toolbar(app: &mut PlannerApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  Plan  ").font(theme::font_menu()), |ui| {
            if ui
                .add_enabled(!app.planner.read_only(), egui::Button::new("  New Task..."))
                .clicked()
            {
                app.open_add_task();
                ui.close_menu();
            }
            if ui.button("  New Milestone...").clicked() {
                app.open_milestone_dialog(None);
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            if ui.button("  Zoom In        Ctrl+Scroll ↑").clicked() {
                app.planner.zoom_in();
                ui.close_menu();
            }
            if ui.button("  Zoom Out      Ctrl+Scroll ↓").clicked() {
                app.planner.zoom_out();
                ui.close_menu();
            }
            ui.separator();
            ui.label(RichText::new("Range").small().weak());
            let mode = app.planner.viewport().mode();
            if ui.radio(mode == ViewMode::Annual, "Annual").clicked() {
                app.set_mode(ViewMode::Annual);
                ui.close_menu();
            }
            if ui.radio(mode == ViewMode::Monthly, "Monthly").clicked() {
                app.set_mode(ViewMode::Monthly);
                ui.close_menu();
            }
            ui.separator();
            let mut show_today = app.planner.show_today_line();
            if ui.checkbox(&mut show_today, "Today line").changed() {
                app.planner.set_show_today_line(show_today);
            }
            if ui.button("  Go to Today").clicked() {
                app.go_to_today();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_menu()), |ui| {
            if ui.button("About").clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        ui.separator();

        if app.planner.viewport().mode() == ViewMode::Monthly {
            if ui
                .small_button(egui_phosphor::regular::CARET_LEFT)
                .on_hover_text("Previous month")
                .clicked()
                && !app.planner.navigate_month(-1)
            {
                app.status_message = "No earlier month in the configured years".into();
            }

            let current = app.planner.viewport().range().start();
            let label = app.planner.viewport().label();
            egui::ComboBox::from_id_salt("month_picker")
                .selected_text(label)
                .show_ui(ui, |ui| {
                    for (year, month) in app.planner.viewport().selectable_months() {
                        let name = format!("{} {}", MONTH_NAMES[month as usize - 1], year);
                        let is_current = current.year() == year && current.month() == month;
                        if ui.selectable_label(is_current, name).clicked() {
                            app.show_month(year, month);
                        }
                    }
                });

            if ui
                .small_button(egui_phosphor::regular::CARET_RIGHT)
                .on_hover_text("Next month")
                .clicked()
                && !app.planner.navigate_month(1)
            {
                app.status_message = "No later month in the configured years".into();
            }
        } else {
            ui.label(RichText::new(app.planner.viewport().label()).strong());
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if app.planner.read_only() {
                ui.label(
                    RichText::new(format!("{} Read-only", egui_phosphor::regular::LOCK))
                        .size(11.0)
                        .color(theme::ARROW_WARNING),
                );
            }
            if app.planner.is_linking() {
                ui.label(
                    RichText::new(format!("{} Linking… (Esc to cancel)", egui_phosphor::regular::LINK))
                        .size(11.0)
                        .color(theme::LINK_BAND),
                );
            }
        });
    });
}
