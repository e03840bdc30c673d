use crate::app::{PlannerApp, View};
use crate::ui::theme;
use egui::{menu, RichText, Ui};
use planflow::model::Level;
use planflow::timeline::{TimelineFilter, ZoomLevel};

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut PlannerApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_menu()), |ui| {
            if ui.button("  New Plan").clicked() {
                app.new_project();
                ui.close_menu();
            }
            if ui.button("  Open...").clicked() {
                app.open_project();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("  Save          Ctrl+S").clicked() {
                app.save_project();
                ui.close_menu();
            }
            if ui.button("  Save As...").clicked() {
                app.save_project_as();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("  Import Plan JSON...").clicked() {
                app.import_plan();
                ui.close_menu();
            }
            if ui.button("  Import Schedule JSON...").clicked() {
                app.import_schedule();
                ui.close_menu();
            }
            if ui.button("  Import Schedule CSV...").clicked() {
                app.import_csv();
                ui.close_menu();
            }
            if ui.button("  Export Schedule CSV...").clicked() {
                app.export_csv();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("  Save Settings").clicked() {
                app.save_settings();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            if ui.radio_value(&mut app.view, View::Flow, "Flow canvas").clicked() {
                ui.close_menu();
            }
            if ui.radio_value(&mut app.view, View::Timeline, "Timeline").clicked() {
                ui.close_menu();
            }
            ui.separator();
            ui.label(RichText::new("Timeline Scale").small().weak());
            for zoom in ZoomLevel::ALL {
                if ui
                    .radio_value(&mut app.timeline_options.zoom, zoom, zoom.label())
                    .clicked()
                {
                    ui.close_menu();
                }
            }
            ui.separator();
            let mut pending_only = app.timeline_options.filter == TimelineFilter::PendingActionItems;
            if ui.checkbox(&mut pending_only, "Hide finished action items").changed() {
                app.timeline_options.filter = if pending_only {
                    TimelineFilter::PendingActionItems
                } else {
                    TimelineFilter::All
                };
            }
            if ui.button("  Expand All").clicked() {
                app.expand.expand_all(&app.project.schedule);
                ui.close_menu();
            }
            if ui.button("  Collapse All").clicked() {
                app.expand.collapse_all();
                ui.close_menu();
            }
        });

        ui.separator();

        if app.view == View::Flow {
            if let Level::SubSteps(task_id) = app.level.clone() {
                let back = format!("{}  Tasks", egui_phosphor::regular::ARROW_LEFT);
                if ui.button(back).clicked() {
                    app.open_level(Level::Tasks);
                }
                let title = app
                    .project
                    .plan
                    .task(&task_id)
                    .map(|t| t.title.clone())
                    .unwrap_or(task_id);
                ui.label(RichText::new(title).strong());
            }
            if ui
                .button(format!("{}  Card", egui_phosphor::regular::PLUS))
                .clicked()
            {
                app.add_card();
            }
            if ui
                .button(format!("{}  Auto-layout", egui_phosphor::regular::TREE_STRUCTURE))
                .on_hover_text("Ctrl+L")
                .clicked()
            {
                app.request_layout();
            }
        }

        // Right-aligned project name
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let modified = if app.file_path.is_some() { "" } else { " (unsaved)" };
            ui.label(
                RichText::new(format!("{}{}", app.project.name, modified))
                    .size(11.0)
                    .weak(),
            );
        });
    });
}
